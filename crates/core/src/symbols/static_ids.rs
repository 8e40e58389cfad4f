//! Replacement of compiler-assigned resource ids with stable placeholders.
//!
//! The resource compiler may hand out different literals for the same resource depending
//! on input order, which defeats output caching. Two schemes are provided: flattening every
//! id in a symbol table to `0x1`, and rewriting generated `R.java` sources so each id is a
//! hash of its package, resource type and name.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use xxhash_rust::xxh3::xxh3_64;

static HEX_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[0-9A-Fa-f]{8}").unwrap());

static PACKAGE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*package ([a-zA-Z_$][a-zA-Z\d_$]*(?:\.[a-zA-Z_$][a-zA-Z\d_$]*)*)").unwrap()
});

static TYPE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"public static (?:final )?class ([A-Za-z_][A-Za-z0-9_]*) \{").unwrap());

static INT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"public static (final )?int ([\w.]+)=0x[0-9A-Fa-f]+;").unwrap()
});

/// Replaces every eight digit hex literal with `0x1`.
pub fn flatten_hex_ids(text: &str) -> String {
    HEX_ID.replace_all(text, "0x1").into_owned()
}

/// Stable id for a resource, independent of the value the compiler assigned.
pub fn static_id(package: &str, res_type: &str, name: &str) -> u32 {
    let key = format!("{package}\0{res_type}\0{name}");
    xxh3_64(key.as_bytes()) as u32
}

/// Byte offset of the `}` closing a block whose body starts at `start`.
fn closing_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn rewrite_block(package: &str, res_type: &str, body: &str) -> String {
    INT_ID
        .replace_all(body, |caps: &Captures<'_>| {
            let modifier = caps.get(1).map_or("", |m| m.as_str());
            let name = &caps[2];
            format!(
                "public static {}int {}=0x{:08X};",
                modifier,
                name,
                static_id(package, res_type, name)
            )
        })
        .into_owned()
}

/// Rewrites the `int` ids inside each per-type class of a generated `R.java`.
///
/// Sources without a package declaration come back unchanged, as does all text outside
/// the rewritten literals.
pub fn replace_ids_with_static_ids(contents: &str) -> String {
    let Some(package) = PACKAGE_DECL
        .captures(contents)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return contents.to_string();
    };

    let mut out = String::with_capacity(contents.len());
    let mut cursor = 0;
    for caps in TYPE_CLASS.captures_iter(contents) {
        let (Some(header), Some(res_type)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if header.start() < cursor {
            continue;
        }
        let Some(body_end) = closing_brace(contents, header.end()) else {
            break;
        };

        out.push_str(&contents[cursor..header.end()]);
        out.push_str(&rewrite_block(
            package,
            res_type.as_str(),
            &contents[header.end()..body_end],
        ));
        cursor = body_end;
    }
    out.push_str(&contents[cursor..]);
    out
}
