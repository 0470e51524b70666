// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_note(sections: usize) -> String {
    let section = "## Section\n\nParagraph with **some** content and a [link](https://example.com).\n\n- Bullet point\n  - Nested item\n- [ ] Task item\n1. First\n1. Second\n\n> A quote\n\n| a | b |\n| --- | --: |\n| 1 | 22 |\n\n```rust\nfn example() {}\n```\n\n---\n\n";
    let mut content = String::from("# Title\n\n");
    content.push_str(&section.repeat(sections));
    content
}
