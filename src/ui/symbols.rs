pub(crate) struct Symbols {
    pub spinner_frames: &'static [&'static str],
    pub prompt: &'static str,
    pub check: &'static str,
    pub record: &'static str,
    pub corner: &'static str,
    pub dot: &'static str,
    pub ellipsis: &'static str,
    pub warning: &'static str,
}

impl Symbols {
    pub fn current() -> &'static Self {
        #[cfg(windows)]
        {
            let is_modern = std::env::var("WT_SESSION").is_ok()
                || std::env::var("TERM_PROGRAM").is_ok()
                || std::env::var("ALACRITTY_WINDOW_ID").is_ok();
            if !is_modern {
                return &ASCII_SYMBOLS;
            }
        }
        &UNICODE_SYMBOLS
    }
}

const UNICODE_SYMBOLS: Symbols = Symbols {
    spinner_frames: &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"],
    prompt: "❯",
    check: "✔",
    record: "⏺",
    corner: "⎿",
    dot: "·",
    ellipsis: "…",
    warning: "⚠",
};

#[cfg_attr(not(windows), allow(dead_code))]
const ASCII_SYMBOLS: Symbols = Symbols {
    spinner_frames: &["|", "/", "-", "\\"],
    prompt: ">",
    check: "[x]",
    record: "*",
    corner: "\\",
    dot: "-",
    ellipsis: "...",
    warning: "!",
};
