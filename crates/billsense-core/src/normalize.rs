//! Merchant name normalization
//!
//! Bank descriptions for the same merchant vary per charge: payment
//! processor prefixes, store numbers, order ids, legal suffixes. The
//! normalized form strips those so charges can be grouped by exact key.

/// Payment method / processor prefixes that vary per transaction
const PROCESSOR_PREFIXES: &[&str] = &[
    "PAYPAL *",
    "PAYPAL*",
    "PP*",
    "SQ *",
    "SQ*",
    "TST* ",
    "TST*",
    "SP * ",
    "SP *",
    "APLPAY ",
    "APPLEPAY ",
    "GOOGLE *",
    "POS ",
    "ACH ",
    "RECURRING ",
];

/// Legal-entity suffixes dropped from the end of a name
const LEGAL_SUFFIXES: &[&str] = &[
    "INC",
    "LLC",
    "LTD",
    "CORP",
    "CO",
    "CORPORATION",
    "LIMITED",
    "PLC",
];

/// Normalize a transaction description into a grouping key.
///
/// Uppercases, strips processor prefixes, trailing numeric ids and legal
/// suffixes, and collapses whitespace. Returns an empty string only for
/// descriptions with no visible characters.
pub fn normalize_merchant(description: &str) -> String {
    let mut upper = description.trim().to_uppercase();

    // Prefixes can stack, e.g. "APLPAY SQ *COFFEE"
    loop {
        let before = upper.len();
        for prefix in PROCESSOR_PREFIXES {
            if let Some(rest) = upper.strip_prefix(prefix) {
                upper = rest.trim_start().to_string();
            }
        }
        if upper.len() == before {
            break;
        }
    }

    let spaced = upper.replace(['*', '#'], " ");
    let mut tokens: Vec<&str> = spaced.split_whitespace().collect();

    loop {
        let before = tokens.len();
        while tokens.len() > 1 && tokens.last().is_some_and(|t| is_numeric_id(t)) {
            tokens.pop();
        }
        while tokens.len() > 1 && tokens.last().is_some_and(|t| is_legal_suffix(t)) {
            tokens.pop();
        }
        if tokens.len() == before {
            break;
        }
    }

    let mut normalized = tokens.join(" ");
    // "ACME, INC" leaves a dangling comma behind
    while normalized.ends_with(',') {
        normalized.pop();
    }
    normalized
}

/// Store numbers, phone numbers and posting dates: "0455", "800-266-2278", "09/28"
fn is_numeric_id(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '/')
}

fn is_legal_suffix(token: &str) -> bool {
    let bare = token.trim_matches(|c| c == '.' || c == ',');
    LEGAL_SUFFIXES.contains(&bare)
}

/// Derive a display merchant name from an email sender.
///
/// Uses the local-part with non-letters stripped, title-cased. Role
/// mailboxes ("billing", "noreply", ...) name nobody, so those fall back
/// to the sender's domain name instead. Accepts both bare addresses and
/// `Display Name <addr@host>`.
pub fn merchant_from_sender(sender: &str, role_mailboxes: &[String]) -> Option<String> {
    let address = match (sender.find('<'), sender.rfind('>')) {
        (Some(start), Some(end)) if start < end => &sender[start + 1..end],
        _ => sender,
    }
    .trim();

    let (local, domain) = match address.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (address, None),
    };

    let letters = letters_lower(local);
    if !letters.is_empty() && !role_mailboxes.iter().any(|r| *r == letters) {
        return Some(title_case(&letters));
    }

    let label = domain.and_then(domain_name_label)?;
    let letters = letters_lower(label);
    if letters.is_empty() {
        return None;
    }
    Some(title_case(&letters))
}

/// Pick the label that names the organization: "comcast" from
/// "billing.comcast.net", "bt" from "bt.co.uk".
fn domain_name_label(domain: &str) -> Option<&str> {
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    match labels.len() {
        0 => None,
        1 => Some(labels[0]),
        n => {
            let candidate = labels[n - 2];
            if n >= 3 && matches!(candidate, "co" | "com" | "net" | "org") {
                Some(labels[n - 3])
            } else {
                Some(candidate)
            }
        }
    }
}

fn letters_lower(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
