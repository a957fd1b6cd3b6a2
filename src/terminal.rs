use std::io::{self, IsTerminal};

/// Reports how many columns the output can use, if that is knowable.
pub trait WidthProbe {
    fn width(&self) -> Option<usize>;
}

pub struct TerminalWidth;

impl WidthProbe for TerminalWidth {
    fn width(&self) -> Option<usize> {
        if !io::stdout().is_terminal() {
            return None;
        }
        crossterm::terminal::size()
            .ok()
            .map(|(columns, _)| usize::from(columns))
            .filter(|columns| *columns > 0)
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedWidth(pub Option<usize>);

#[cfg(test)]
impl WidthProbe for FixedWidth {
    fn width(&self) -> Option<usize> {
        self.0
    }
}

pub fn resolve_width(explicit: Option<usize>, probe: &dyn WidthProbe, fallback: usize) -> usize {
    explicit.or_else(|| probe.width()).unwrap_or(fallback)
}
