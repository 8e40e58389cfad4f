use respack_api::{SymbolTable, ValueType};
use std::fmt::Write;

const HEADER: &str = "\
/* AUTO-GENERATED FILE.  DO NOT MODIFY.
 *
 * This class was automatically generated by respack
 * from the resource data it found.  It
 * should not be modified by hand.
 */
";

/// Renders `R.java` for `package`. Types and names are emitted in sorted order.
///
/// `final_ids` marks every field `final`, which is only correct for the project's own
/// package: library ids are reassigned when the final application is linked.
pub fn render_r_java(package: &str, table: &SymbolTable, final_ids: bool) -> String {
    let modifier = if final_ids { "final " } else { "" };
    let mut out = String::from(HEADER);
    if !package.is_empty() {
        let _ = writeln!(out, "package {package};");
        out.push('\n');
    }
    out.push_str("public final class R {\n");

    for (res_type, entries) in table.by_type() {
        let _ = writeln!(out, "    public static final class {res_type} {{");
        for entry in entries {
            let java_type = match entry.value_type {
                ValueType::Int => "int",
                ValueType::IntArray => "int[]",
            };
            let _ = writeln!(
                out,
                "        public static {modifier}{java_type} {}={};",
                entry.name(),
                entry.value.trim()
            );
        }
        out.push_str("    }\n");
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_r_java() {
        let table = SymbolTable::parse(
            "int string b 0x7f020001\nint string a 0x7f020000\nint[] styleable S { 0x7f010000 }\n",
        )
        .unwrap();

        let source = render_r_java("com.example", &table, false);
        let expected_body = "\
package com.example;

public final class R {
    public static final class string {
        public static int a=0x7f020000;
        public static int b=0x7f020001;
    }
    public static final class styleable {
        public static int[] S={ 0x7f010000 };
    }
}
";
        assert!(source.starts_with("/* AUTO-GENERATED FILE."));
        assert!(source.ends_with(expected_body));
    }

    #[test]
    fn test_render_final_ids() {
        let table = SymbolTable::parse("int id root 0x7f030000\n").unwrap();
        let source = render_r_java("com.example", &table, true);
        assert!(source.contains("public static final int root=0x7f030000;"));
    }
}
