// ABOUTME: GSM 03.38 default alphabet encoder for text-mode message bodies
// ABOUTME: Produces one septet per byte, as the modem expects after the body prompt

/// Control byte (Ctrl-Z) that ends a message body and submits it
pub const END_OF_BODY: u8 = 0x1A;

/// Escape byte; aborts a pending body prompt
pub const ESCAPE: u8 = 0x1B;

/// Septet written for characters the default alphabet cannot express
const REPLACEMENT: u8 = b'?';

/// GSM 03.38 default alphabet, indexed by septet value.
///
/// Slot 0x1B is the escape to the extension table and is never produced.
const BASIC_ALPHABET: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1b}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Encodes a single character, or `None` if it has no safe septet.
///
/// `Ξ` shares its septet with [`END_OF_BODY`] and the escape slot would
/// cancel the body prompt, so neither may appear inside a body.
fn septet(c: char) -> Option<u8> {
    BASIC_ALPHABET
        .iter()
        .position(|&candidate| candidate == c)
        .map(|index| index as u8)
        .filter(|&septet| septet != END_OF_BODY && septet != ESCAPE)
}

/// Encodes `text` into default-alphabet septets, one per byte.
///
/// Characters outside the default alphabet (including the extension table,
/// which needs an escape byte that text mode cannot carry) become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| septet(c).unwrap_or(REPLACEMENT))
        .collect()
}

/// Returns true if every character of `text` survives [`encode`] unchanged
pub fn is_encodable(text: &str) -> bool {
    text.chars().all(|c| septet(c).is_some())
}
