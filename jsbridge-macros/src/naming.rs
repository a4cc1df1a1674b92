// Name conversion between Rust identifiers and script member names.

/// `snake_case` to `camelCase`; a leading `r#` is dropped.
pub fn to_camel_case(s: &str) -> String {
    let s = s.strip_prefix("r#").unwrap_or(s);
    let mut out = String::with_capacity(s.len());
    for (i, part) in s.split('_').filter(|part| !part.is_empty()).enumerate() {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if i > 0 => {
                out.extend(c.to_uppercase());
                out.push_str(chars.as_str());
            }
            Some(c) => {
                out.push(c);
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_snake_case() {
        assert_eq!(to_camel_case("add"), "add");
        assert_eq!(to_camel_case("set_total_count"), "setTotalCount");
        assert_eq!(to_camel_case("_hidden_name"), "hiddenName");
        assert_eq!(to_camel_case("r#type"), "type");
    }
}
