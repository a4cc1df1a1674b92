// `jsbridge inspect`: decode a type record the way the engine would read it.

use std::fmt::Write as _;
use std::path::Path;

use jsbridge_runtime::{decode_type_record, TypeRecord};

pub fn run_inspect(path: &Path, hex: bool, json: bool) -> Result<(), String> {
    let raw = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let bytes = if hex {
        let text = String::from_utf8(raw).map_err(|e| format!("{}: {e}", path.display()))?;
        parse_hex(&text)?
    } else {
        raw
    };
    let record = decode_type_record(&bytes).map_err(|e| e.to_string())?;
    if json {
        let out = serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        print!("{}", render(&record));
    }
    Ok(())
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("hex input has an odd number of digits".into());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(s, 16).map_err(|_| format!("invalid hex byte `{s}`"))
        })
        .collect()
}

fn render(record: &TypeRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "type `{}` (registration {})", record.name, record.type_id);
    let entries = record.entries();
    if entries.is_empty() {
        let _ = writeln!(out, "  (no members)");
    }
    for (kind, id, name) in entries {
        let kind = format!("{kind:?}");
        let _ = writeln!(out, "  {id:>5}  {kind:<8}  {name}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbridge_runtime::{FieldMember, MethodMember, TypeDefinition};

    #[test]
    fn hex_input_ignores_whitespace() {
        assert_eq!(parse_hex("01 0a\nFF").unwrap(), vec![0x01, 0x0a, 0xff]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn render_lists_members_in_record_order() {
        let def = TypeDefinition::builder("Point")
            .field(FieldMember::new("x"))
            .method(MethodMember::host_static("origin", || 0i32))
            .build()
            .unwrap();
        let bytes = jsbridge_runtime::encode_type_definition(&def, 3).unwrap();
        let text = render(&decode_type_record(&bytes).unwrap());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "type `Point` (registration 3)");
        assert!(lines[1].contains("Field") && lines[1].ends_with(" x"));
        assert!(lines[2].contains("Method") && lines[2].ends_with(" origin"));
    }
}
