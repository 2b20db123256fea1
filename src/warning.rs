/// Repeated-warning throttle
///
/// Each kind of warning is written at most `limit` times. Reaching the limit
/// writes one meta warning, after which the kind stays silent. A limit of 0
/// silences everything and a negative limit disables throttling.
use log::debug;
use std::collections::HashMap;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// `popchar` of a value that is not a Unicode scalar value
    WriteUtf8Range,
}

impl WarningKind {
    pub fn name(self) -> &'static str {
        match self {
            WarningKind::WriteUtf8Range => "write-utf8-range",
        }
    }
}

pub const DEFAULT_WARNING_LIMIT: i64 = 3;

pub struct Warnings {
    limit: i64,
    counters: HashMap<WarningKind, i64>,
    sink: Box<dyn Write>,
}

impl Warnings {
    /// Warnings written to standard error
    pub fn new(limit: i64) -> Self {
        Warnings::with_sink(limit, Box::new(io::stderr()))
    }

    pub fn with_sink(limit: i64, sink: Box<dyn Write>) -> Self {
        Warnings {
            limit,
            counters: HashMap::new(),
            sink,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    fn exhausted(&self, count: i64) -> bool {
        self.limit >= 0 && count >= self.limit
    }

    pub fn warn(&mut self, kind: WarningKind, message: &str) -> io::Result<()> {
        let count = self.counters.get(&kind).copied().unwrap_or(0);
        if self.exhausted(count) {
            debug!("warning '{}' suppressed", kind.name());
            return Ok(());
        }
        let count = count + 1;
        self.counters.insert(kind, count);
        writeln!(self.sink, "{}", message)?;
        if self.exhausted(count) {
            writeln!(
                self.sink,
                "[Warning:Meta] The warning '{}' has reached the limit {} and will be suppressed",
                kind.name(),
                self.limit
            )?;
        }
        self.sink.flush()
    }

    /// `popchar` wrote a replacement character for `hex`
    pub fn warn_utf8_range(&mut self, hex: &str) -> io::Result<()> {
        self.warn(
            WarningKind::WriteUtf8Range,
            &format!(
                "[Warning:UndefinedBehavior:write-utf8-range] value {} is out of unicode codepoint range.",
                hex
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedSink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    #[test]
    fn test_limit_and_meta_warning() {
        let sink = SharedSink::default();
        let mut warnings = Warnings::with_sink(2, Box::new(sink.clone()));
        for _ in 0..5 {
            warnings.warn_utf8_range("110000").unwrap();
        }
        let text = sink.text();
        assert_eq!(text.matches("write-utf8-range] value 110000").count(), 2);
        assert_eq!(text.matches("[Warning:Meta]").count(), 1);
        assert!(text.contains("has reached the limit 2"));
    }

    #[test]
    fn test_zero_limit_is_silent() {
        let sink = SharedSink::default();
        let mut warnings = Warnings::with_sink(0, Box::new(sink.clone()));
        warnings.warn_utf8_range("-1").unwrap();
        assert!(sink.text().is_empty());
    }

    #[test]
    fn test_negative_limit_is_unlimited() {
        let sink = SharedSink::default();
        let mut warnings = Warnings::with_sink(-1, Box::new(sink.clone()));
        for _ in 0..10 {
            warnings.warn_utf8_range("-1").unwrap();
        }
        assert_eq!(sink.text().lines().count(), 10);
    }
}
