use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Labelled display regions outside the typed-text area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// Which source book the text is constructed from.
    Book,
    /// Order of approximation used for the construction.
    Order,
    /// Server status notices.
    Status,
}

/// Where rendered output lands.
///
/// The typed-text area is append-only: `put_char` and `line_break` grow it
/// one step at a time and `clear` starts it over. Region writes replace the
/// region's whole content. The render worker and the message pump both hold
/// the surface, so implementations must be shareable across tasks.
pub trait Surface: Send + Sync {
    /// Append one character to the typed-text area.
    fn put_char(&self, ch: char);

    /// Append a line break to the typed-text area.
    fn line_break(&self);

    /// Replace the content of a labelled region.
    fn set_region(&self, region: Region, content: &str);

    /// Clear the typed-text area and every region.
    fn clear(&self);

    /// Enable or disable the submit control.
    fn set_submit_enabled(&self, enabled: bool);
}

/// Terminal surface: typed text streams one character at a time into the
/// writer (stdout by default). The book/order labels print as a bracketed
/// header line just before the text they describe; a trailing label-only
/// update prints its header when the read ends. Status notices go to
/// stderr.
pub struct TerminalSurface {
    state: Mutex<TermState>,
    out: Mutex<Box<dyn Write + Send>>,
    submit_enabled: AtomicBool,
}

#[derive(Default)]
struct TermState {
    book: String,
    order: String,
    header_pending: bool,
    typed_any: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Render into any byte sink instead of stdout.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(TermState::default()),
            out: Mutex::new(out),
            submit_enabled: AtomicBool::new(true),
        }
    }

    /// Whether the submit control is currently enabled.
    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled.load(Ordering::Relaxed)
    }

    fn write_header(state: &mut TermState, out: &mut dyn Write) {
        if !state.header_pending {
            return;
        }
        let labels: Vec<&str> = [state.book.as_str(), state.order.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if !labels.is_empty() {
            // Mid-transcript the header gets its own line.
            if state.typed_any {
                let _ = out.write_all(b"\n");
            }
            let _ = writeln!(out, "[{}]", labels.join(" | "));
            let _ = out.flush();
        }
        state.header_pending = false;
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn put_char(&self, ch: char) {
        let mut state = self.state.lock().unwrap();
        let mut out = self.out.lock().unwrap();
        Self::write_header(&mut state, &mut **out);
        state.typed_any = true;
        let mut buf = [0u8; 4];
        let _ = out.write_all(ch.encode_utf8(&mut buf).as_bytes());
        let _ = out.flush();
    }

    fn line_break(&self) {
        let mut state = self.state.lock().unwrap();
        let mut out = self.out.lock().unwrap();
        Self::write_header(&mut state, &mut **out);
        state.typed_any = true;
        let _ = out.write_all(b"\n");
        let _ = out.flush();
    }

    fn set_region(&self, region: Region, content: &str) {
        let mut state = self.state.lock().unwrap();
        match region {
            Region::Book => {
                if state.book != content {
                    state.book = content.to_string();
                    state.header_pending = true;
                }
            }
            Region::Order => {
                if state.order != content {
                    state.order = content.to_string();
                    state.header_pending = true;
                }
            }
            Region::Status => {
                // Notices may land mid-line while text is being typed.
                if state.typed_any {
                    eprintln!();
                }
                eprintln!("[{content}]");
            }
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        if state.typed_any {
            let mut out = self.out.lock().unwrap();
            let _ = out.write_all(b"\n\n");
            let _ = out.flush();
        }
        *state = TermState::default();
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.submit_enabled.store(enabled, Ordering::Relaxed);
        if enabled {
            // End of a read; a trailing label-only update would otherwise
            // never show its header.
            let mut state = self.state.lock().unwrap();
            let mut out = self.out.lock().unwrap();
            Self::write_header(&mut state, &mut **out);
        }
    }
}

/// In-memory surface for tests and headless use; captures exactly what a
/// real surface would have shown.
#[derive(Default)]
pub struct MemorySurface {
    state: Mutex<MemState>,
}

struct MemState {
    text: String,
    book: Option<String>,
    order: Option<String>,
    status: Option<String>,
    submit_enabled: bool,
}

impl Default for MemState {
    fn default() -> Self {
        Self {
            text: String::new(),
            book: None,
            order: None,
            status: None,
            submit_enabled: true,
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything typed so far, with breaks as newlines.
    pub fn text(&self) -> String {
        self.state.lock().unwrap().text.clone()
    }

    /// Current content of a labelled region, if it has been set.
    pub fn region(&self, region: Region) -> Option<String> {
        let state = self.state.lock().unwrap();
        match region {
            Region::Book => state.book.clone(),
            Region::Order => state.order.clone(),
            Region::Status => state.status.clone(),
        }
    }

    pub fn submit_enabled(&self) -> bool {
        self.state.lock().unwrap().submit_enabled
    }
}

impl Surface for MemorySurface {
    fn put_char(&self, ch: char) {
        self.state.lock().unwrap().text.push(ch);
    }

    fn line_break(&self) {
        self.state.lock().unwrap().text.push('\n');
    }

    fn set_region(&self, region: Region, content: &str) {
        let mut state = self.state.lock().unwrap();
        let slot = match region {
            Region::Book => &mut state.book,
            Region::Order => &mut state.order,
            Region::Status => &mut state.status,
        };
        *slot = Some(content.to_string());
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        let submit_enabled = state.submit_enabled;
        *state = MemState::default();
        state.submit_enabled = submit_enabled;
    }

    fn set_submit_enabled(&self, enabled: bool) {
        self.state.lock().unwrap().submit_enabled = enabled;
    }
}
