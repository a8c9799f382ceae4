/// Legal-entity suffixes, matched against whole word tokens. The text up
/// to the last occurrence is taken as the company name; anything after it
/// (typically a signatory's personal name appended on the invoice) is
/// discarded.
static LEGAL_SUFFIXES: &[&str] = &[
    "pty", "ltd", "limited", "llc", "inc", "incorporated", "corp", "co", "llp", "gmbh", "plc",
    "cc",
];

/// Payment-processing artifacts that say nothing about who was paid.
static STOP_WORDS: &[&str] = &[
    "eft", "ppd", "payment", "pmt", "pos", "debit", "credit", "order", "ref", "trf", "transfer",
];

/// Reduce a free-text supplier or description string to a comparable key:
/// lowercase, truncated at the last legal suffix, punctuation stripped,
/// stop words and suffixes dropped, single-spaced.
pub fn normalize_supplier(name: &str) -> String {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    // Word-level comparison gives the suffix search its word-boundary
    // anchoring: "co" the suffix never matches the "co" in "Vodacom".
    let words = match words.iter().rposition(|w| LEGAL_SUFFIXES.contains(w)) {
        Some(last_suffix) => &words[..=last_suffix],
        None => &words[..],
    };

    words
        .iter()
        .filter(|w| !LEGAL_SUFFIXES.contains(w) && !STOP_WORDS.contains(w))
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
