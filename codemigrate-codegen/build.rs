//! Renders literal fixtures with `embed` so tests can check what rustc makes of them.

#[path = "src/embed.rs"]
mod embed;

use std::{env, fs, path::PathBuf};

/// Kept in sync with `tests/literal_fidelity.rs`.
const TEXT: &str = "quote \" backslash \\ tab \t newline \n nul \0 bell \u{7} caf\u{e9} \u{1f980} \u{202e}end";

fn main() {
    println!("cargo:rerun-if-changed=src/embed.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let all_bytes: Vec<u8> = (0..=255).collect();
    let fixture = format!(
        "pub const ALL_BYTES: &[u8] = {};\npub const TEXT: &str = {};\n",
        embed::byte_string_literal(&all_bytes),
        embed::str_literal(TEXT),
    );
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR"));
    fs::write(out_dir.join("literal_fixture.rs"), fixture).expect("write literal fixture");
}
