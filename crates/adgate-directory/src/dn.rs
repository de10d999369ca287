//! Distinguished name helpers

/// Escape an attribute value for use in a DN (RFC 4514)
pub fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut result = String::with_capacity(value.len());

    for (i, c) in value.chars().enumerate() {
        match c {
            '"' | '+' | ',' | ';' | '<' | '>' | '\\' | '=' => {
                result.push('\\');
                result.push(c);
            }
            '#' if i == 0 => {
                result.push('\\');
                result.push(c);
            }
            ' ' if i == 0 || i == last => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Whether a location is already a DN rather than an OU path
pub fn is_dn(location: &str) -> bool {
    location.contains('=')
}

/// Resolve an OU path ("Sales/EMEA") or DN against the base DN.
///
/// Path segments are outermost first, so "Sales/EMEA" becomes
/// `OU=EMEA,OU=Sales,<base>`. An empty location is the base itself.
pub fn location_to_dn(location: &str, base_dn: &str) -> String {
    let location = location.trim().trim_matches('/');
    if location.is_empty() {
        return base_dn.to_string();
    }
    if is_dn(location) {
        return location.to_string();
    }

    let mut rdns: Vec<String> = location
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("OU={}", escape_dn_value(s)))
        .collect();
    rdns.reverse();

    if base_dn.is_empty() {
        rdns.join(",")
    } else {
        format!("{},{}", rdns.join(","), base_dn)
    }
}

/// Split a DN into its first RDN and the parent DN
pub fn split_dn(dn: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => return (dn[..i].trim(), dn[i + 1..].trim()),
            _ => escaped = false,
        }
    }
    (dn.trim(), "")
}

/// Value of the first RDN, unescaped ("CN=Doe\, Jane,..." gives "Doe, Jane")
pub fn rdn_value(dn: &str) -> String {
    let (rdn, _) = split_dn(dn);
    let raw = rdn.split_once('=').map(|(_, v)| v).unwrap_or(rdn);

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Case-insensitive DN comparison ignoring whitespace around separators
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Whether `dn` sits somewhere below `ancestor`
pub fn is_descendant(dn: &str, ancestor: &str) -> bool {
    let dn = normalize(dn);
    let ancestor = normalize(ancestor);
    dn.len() > ancestor.len() && dn.ends_with(&format!(",{}", ancestor))
}

fn normalize(dn: &str) -> String {
    dn.split(',')
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}
