//! RFC 5545 content-line folding and text escaping.
//!
//! Folding is measured in octets of the UTF-8 encoding, not characters, so
//! multi-byte Hebrew text never gets split inside a code point.

/// Maximum octets of one physical line, excluding the CRLF terminator.
pub const MAX_LINE_OCTETS: usize = 75;

/// Emit `line` as one logical content line, folded at 75 octets with
/// CRLF + SP continuations. The result always ends with CRLF.
pub fn fold_line(line: &str) -> String {
  if line.len() <= MAX_LINE_OCTETS {
    return format!("{line}\r\n");
  }

  let total = line.len();
  let mut out = String::with_capacity(total + total / 64);
  let mut pos = 0usize;
  let mut first = true;

  while pos < total {
    // Continuation lines spend one octet on the leading space.
    let budget = if first { MAX_LINE_OCTETS } else { MAX_LINE_OCTETS - 1 };
    let end = if pos + budget >= total {
      total
    } else {
      // Walk back to the nearest char boundary; every segment keeps at
      // least one byte so the loop always terminates.
      let mut e = pos + budget;
      while e > pos && !line.is_char_boundary(e) {
        e -= 1;
      }
      if e == pos { pos + 1 } else { e }
    };

    if !first {
      out.push(' ');
    }
    out.push_str(&line[pos..end]);
    out.push_str("\r\n");
    pos = end;
    first = false;
  }

  out
}

/// Escape a property text value: `\`, `;`, `,`, newline. Bare CRs are
/// dropped rather than escaped.
pub fn escape_text(s: &str) -> String {
  s.replace('\\', "\\\\")
    .replace(';', "\\;")
    .replace(',', "\\,")
    .replace('\r', "")
    .replace('\n', "\\n")
}
