/// Interview languages offered on the setup screen, with their speech locale tags.
pub const SUPPORTED_LANGUAGES: &[(&str, &str, &str)] = &[
    ("en", "English", "en-US"),
    ("hi", "Hindi", "hi-IN"),
    ("es", "Spanish", "es-ES"),
    ("fr", "French", "fr-FR"),
    ("de", "German", "de-DE"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _, _)| *c == code)
}

/// Maps a language code to the locale tag speech engines expect. Unknown codes use en-US.
pub fn locale_tag(code: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, tag)| *tag)
        .unwrap_or("en-US")
}
