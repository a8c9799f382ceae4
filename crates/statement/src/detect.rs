use concorda_core::BankFormat;
use concorda_extract::RawPage;

/// How many leading pages feed format detection. Statement mastheads and
/// routing markers always sit on the first page; the margin covers cover
/// sheets and notices stapled in front.
pub const DETECTION_PAGES: usize = 3;

/// Ordered keyword signatures. First match wins, so every entry must be
/// unique to its institution: no signature may be a substring of text
/// another bank prints.
static SIGNATURES: &[(BankFormat, &[&str])] = &[
    (BankFormat::Absa, &["absa bank", "absa.co.za", "absa"]),
    (BankFormat::Capitec, &["capitec bank", "capitecbank.co.za", "capitec"]),
    (
        BankFormat::Fnb,
        &["first national bank", "fnb.co.za", "firstrand bank", "fnb"],
    ),
    (
        BankFormat::StandardBank,
        &[
            "the standard bank of south africa",
            "standardbank.co.za",
            "standard bank",
        ],
    ),
];

/// Classify a document's layout from its aggregated text. Matching is
/// case-insensitive substring search; callers pass whatever text they have
/// and get `Unknown` when nothing matches.
pub fn detect_format(text: &str) -> BankFormat {
    let haystack = text.to_lowercase();
    for (format, keywords) in SIGNATURES {
        if keywords.iter().any(|k| haystack.contains(k)) {
            return *format;
        }
    }
    BankFormat::Unknown
}

/// Detect from extracted pages: concatenates the first few pages' lines.
pub fn detect_from_pages(pages: &[RawPage]) -> BankFormat {
    let text: String = pages
        .iter()
        .take(DETECTION_PAGES)
        .flat_map(|p| p.lines.iter())
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    detect_format(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concorda_extract::ExtractionMethod;

    #[test]
    fn detects_each_bank() {
        assert_eq!(detect_format("ABSA Bank Limited, Reg No"), BankFormat::Absa);
        assert_eq!(detect_format("Capitec Bank statement"), BankFormat::Capitec);
        assert_eq!(
            detect_format("First National Bank - a division of FirstRand"),
            BankFormat::Fnb
        );
        assert_eq!(
            detect_format("The Standard Bank of South Africa Limited"),
            BankFormat::StandardBank
        );
    }

    #[test]
    fn abbreviations_match() {
        assert_eq!(detect_format("visit fnb.co.za for details"), BankFormat::Fnb);
        assert_eq!(detect_format("www.absa.co.za"), BankFormat::Absa);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(detect_format("aBsA bAnK"), BankFormat::Absa);
    }

    #[test]
    fn no_signature_is_unknown() {
        assert_eq!(detect_format("Some Credit Union Monthly Summary"), BankFormat::Unknown);
        assert_eq!(detect_format(""), BankFormat::Unknown);
    }

    #[test]
    fn detect_from_pages_uses_leading_pages_only() {
        let mut pages: Vec<RawPage> = (0..5)
            .map(|i| RawPage::text(i, ExtractionMethod::NativeText, vec!["noise".into()]))
            .collect();
        // Signature on a page past the detection window must not match.
        pages[4].lines.push("Capitec Bank".into());
        assert_eq!(detect_from_pages(&pages), BankFormat::Unknown);

        pages[0].lines.push("Capitec Bank".into());
        assert_eq!(detect_from_pages(&pages), BankFormat::Capitec);
    }
}
