use crate::error::SignalingError;
use std::io::Write;

/// The operator's side of the copy-paste channel.
///
/// `R` is the transport's remote stream type; surfaces that do not render
/// media can ignore it.
pub trait OperatorSurface<R> {
    /// Overwrites the outbound description field with the latest offer/answer.
    fn show_description(&mut self, text: &str);

    /// Appends an already framed candidate record to the outbound candidate field.
    fn append_candidate(&mut self, framed: &str);

    fn report(&mut self, error: &SignalingError);

    fn remote_stream_added(&mut self, _stream: R) {}

    fn remote_stream_removed(&mut self) {}
}

/// The outbound text fields, kept in memory.
#[derive(Debug, Default, Clone)]
pub struct TextFields {
    pub description: String,
    pub candidates: String,
    pub errors: Vec<String>,
    pub remote_streams: usize,
}

impl TextFields {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R> OperatorSurface<R> for TextFields {
    fn show_description(&mut self, text: &str) {
        self.description = text.to_string();
    }

    fn append_candidate(&mut self, framed: &str) {
        self.candidates.push_str(framed);
    }

    fn report(&mut self, error: &SignalingError) {
        self.errors.push(error.to_string());
    }

    fn remote_stream_added(&mut self, _stream: R) {
        self.remote_streams += 1;
    }

    fn remote_stream_removed(&mut self) {
        self.remote_streams = 0;
    }
}

/// Prints the outbound fields on stdout so they can be copied to the other
/// side. Errors and stream notices go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    fields: TextFields,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &TextFields {
        &self.fields
    }

    fn print(text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl<R> OperatorSurface<R> for ConsoleSurface {
    fn show_description(&mut self, text: &str) {
        OperatorSurface::<R>::show_description(&mut self.fields, text);
        Self::print("==== copy this to the other side ====");
        Self::print(text);
        Self::print("=====================================");
    }

    fn append_candidate(&mut self, framed: &str) {
        OperatorSurface::<R>::append_candidate(&mut self.fields, framed);
        // the field is CR-framed; a terminal wants newlines
        Self::print(framed.trim_matches('\r').replace('\r', "\n").as_str());
    }

    fn report(&mut self, error: &SignalingError) {
        OperatorSurface::<R>::report(&mut self.fields, error);
        eprintln!("error: {error}");
    }

    fn remote_stream_added(&mut self, _stream: R) {
        self.fields.remote_streams += 1;
        eprintln!("remote stream added ({} track(s))", self.fields.remote_streams);
    }

    fn remote_stream_removed(&mut self) {
        self.fields.remote_streams = 0;
        eprintln!("remote stream removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_keeps_what_it_printed() {
        let mut console = ConsoleSurface::new();
        OperatorSurface::<()>::show_description(&mut console, "{\"type\":\"offer\",\"sdp\":\"v=0\"}");
        OperatorSurface::<()>::append_candidate(&mut console, "\rsep\r{}\r");
        OperatorSurface::<()>::report(
            &mut console,
            &SignalingError::MalformedMessage("not json".into()),
        );

        let fields = console.fields();
        assert!(fields.description.contains("offer"));
        assert_eq!(fields.candidates, "\rsep\r{}\r");
        assert_eq!(fields.errors, vec!["malformed message: not json".to_string()]);
    }

    #[test]
    fn description_overwrites_and_candidates_append() {
        let mut fields = TextFields::new();
        OperatorSurface::<()>::show_description(&mut fields, "first");
        OperatorSurface::<()>::show_description(&mut fields, "second");
        OperatorSurface::<()>::append_candidate(&mut fields, "a");
        OperatorSurface::<()>::append_candidate(&mut fields, "b");

        assert_eq!(fields.description, "second");
        assert_eq!(fields.candidates, "ab");
    }
}
