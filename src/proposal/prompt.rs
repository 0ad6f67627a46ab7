pub const SYSTEM_PROMPT: &str = "\
You are the page engine of a website builder cockpit.
You receive a COMMAND and the CURRENT_HTML of a single page and return the updated page.

## Output contract
- Return ONE complete, self-contained HTML document: <!DOCTYPE html>, <html>, <head>, <body>.
- Never return a fragment, a patch, a diff, or only the changed section.
- Plain HTML only: no Markdown, no code fences, no commentary before or after the document.
- Inline CSS is allowed; do not load external scripts.

## Rules
- If the command asks to rebuild, start a fresh page.
- If the command asks to add, extend, or modify, integrate the change and keep the rest of the page.
- If the command asks to clean up or simplify, keep the meaning and improve the structure.
- Layouts are mobile-first.";

/// Bundle the verbatim command and the current document into the user turn.
pub fn build_user_prompt(command: &str, current_document: &str) -> String {
    format!("COMMAND:\n{command}\n\nCURRENT_HTML:\n{current_document}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_keeps_command_and_document_verbatim() {
        let prompt = build_user_prompt("add a footer", "<html><body>A</body></html>");
        assert_eq!(
            prompt,
            "COMMAND:\nadd a footer\n\nCURRENT_HTML:\n<html><body>A</body></html>"
        );
    }
}
