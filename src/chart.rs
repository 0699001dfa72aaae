//! Summary chart: existing trees vs structures vs proposals.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Widget},
};

pub const TREE_COLOR: Color = Color::Green;
pub const STRUCTURE_COLOR: Color = Color::Blue;
pub const PROPOSAL_COLOR: Color = Color::Yellow;

/// The three counts the chart displays
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChartCounts {
    pub trees: usize,
    pub structures: usize,
    pub proposals: usize,
}

impl ChartCounts {
    /// Drawn slice sizes. A zero proposal count is drawn as one unit so the
    /// slice stays visible; labels keep using the real counts.
    pub fn slices(&self) -> [u64; 3] {
        [
            self.trees as u64,
            self.structures as u64,
            self.proposals.max(1) as u64,
        ]
    }

    pub fn total(&self) -> usize {
        self.trees + self.structures + self.proposals
    }
}

/// One drawn chart. Every refresh builds a new instance.
#[derive(Clone, Debug)]
pub struct ChartInstance {
    pub counts: ChartCounts,
    /// Sequence number of the refresh that built this instance
    pub revision: u64,
}

/// Owns the current chart instance
#[derive(Debug, Default)]
pub struct SummaryChart {
    current: Option<ChartInstance>,
    revisions: u64,
}

impl SummaryChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute counts and replace the current instance
    pub fn refresh(&mut self, trees: usize, structures: usize, proposals: usize) -> &ChartInstance {
        self.revisions += 1;
        let counts = ChartCounts {
            trees,
            structures,
            proposals,
        };
        tracing::debug!(?counts, revision = self.revisions, "chart refreshed");
        self.current.insert(ChartInstance {
            counts,
            revision: self.revisions,
        })
    }

    pub fn current(&self) -> Option<&ChartInstance> {
        self.current.as_ref()
    }
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        (part * 100 + total / 2) / total
    }
}

/// Split `width` cells among the slices by cumulative rounding, so the
/// segments always add up to the full width
fn segment_widths(slices: [u64; 3], width: u16) -> [u16; 3] {
    let total: u64 = slices.iter().sum();
    if total == 0 {
        return [0; 3];
    }
    let mut widths = [0; 3];
    let (mut cumulative, mut drawn) = (0u64, 0u16);
    for (i, slice) in slices.iter().enumerate() {
        cumulative += slice;
        let edge = ((cumulative * width as u64 + total / 2) / total) as u16;
        widths[i] = edge - drawn;
        drawn = edge;
    }
    widths
}

impl Widget for &ChartInstance {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(" Shade summary ", Style::default().fg(Color::Cyan)));
        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let counts = self.counts;
        let slices = counts.slices();
        let entries = [
            ("Trees", counts.trees, slices[0], TREE_COLOR),
            ("Struct", counts.structures, slices[1], STRUCTURE_COLOR),
            ("Prop", counts.proposals, slices[2], PROPOSAL_COLOR),
        ];

        let bars: Vec<Bar> = entries
            .iter()
            .map(|&(label, count, slice, color)| {
                Bar::default()
                    .value(slice)
                    .text_value(count.to_string())
                    .label(Line::from(label))
                    .style(Style::default().fg(color))
                    .value_style(Style::default().fg(Color::Black).bg(color))
            })
            .collect();

        BarChart::default()
            .bar_width(6)
            .bar_gap(2)
            .data(BarGroup::default().bars(&bars))
            .render(chunks[0], buf);

        // One stacked bar for the proportions, like a flattened doughnut
        let proportion: Vec<Span> = segment_widths(slices, chunks[1].width)
            .iter()
            .zip(entries.iter())
            .map(|(&w, &(_, _, _, color))| {
                Span::styled("█".repeat(w as usize), Style::default().fg(color))
            })
            .collect();
        Paragraph::new(Line::from(proportion)).render(chunks[1], buf);

        let total = counts.total();
        let shares: Vec<Span> = entries
            .iter()
            .flat_map(|&(_, count, _, color)| {
                [
                    Span::styled("■ ", Style::default().fg(color)),
                    Span::raw(format!("{}%  ", percent(count, total))),
                ]
            })
            .collect();
        Paragraph::new(Line::from(shares)).render(chunks[2], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_proposals_draws_placeholder_slice() {
        let counts = ChartCounts {
            trees: 12,
            structures: 3,
            proposals: 0,
        };
        assert_eq!(counts.slices(), [12, 3, 1]);
        assert_eq!(counts.proposals, 0);
        assert_eq!(counts.total(), 15);
    }

    #[test]
    fn test_slices_match_counts_otherwise() {
        let counts = ChartCounts {
            trees: 0,
            structures: 0,
            proposals: 4,
        };
        assert_eq!(counts.slices(), [0, 0, 4]);
    }

    #[test]
    fn test_refresh_replaces_instance() {
        let mut chart = SummaryChart::new();
        assert!(chart.current().is_none());
        chart.refresh(5, 2, 0);
        let second = chart.refresh(5, 2, 1).clone();
        assert_eq!(second.revision, 2);
        assert_eq!(chart.current().map(|c| c.counts.proposals), Some(1));
    }

    #[test]
    fn test_labels_show_real_counts() {
        let mut chart = SummaryChart::new();
        let instance = chart.refresh(7, 2, 0).clone();
        let area = Rect::new(0, 0, 30, 10);
        let mut buf = Buffer::empty(area);
        (&instance).render(area, &mut buf);

        let text: String = (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains('7'));
        assert!(text.contains('0'));
        assert!(text.contains("Shade summary"));
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn test_segments_fill_width() {
        assert_eq!(segment_widths([12, 3, 1], 32), [24, 6, 2]);
        assert_eq!(segment_widths([1, 1, 1], 10).iter().sum::<u16>(), 10);
        assert_eq!(segment_widths([0, 0, 4], 8), [0, 0, 8]);
        assert_eq!(segment_widths([0, 0, 0], 8), [0, 0, 0]);
    }

    #[test]
    fn test_proportion_bar_is_drawn() {
        let instance = SummaryChart::new().refresh(2, 1, 1).clone();
        let area = Rect::new(0, 0, 30, 10);
        let mut buf = Buffer::empty(area);
        (&instance).render(area, &mut buf);

        // Second-to-last inner row holds the stacked bar
        let row = area.height - 3;
        let colors: Vec<Color> = (1..area.width - 1).map(|x| buf[(x, row)].fg).collect();
        assert!(buf[(1, row)].symbol() == "█");
        assert_eq!(colors.iter().filter(|&&c| c == TREE_COLOR).count(), 14);
        assert_eq!(colors.iter().filter(|&&c| c == STRUCTURE_COLOR).count(), 7);
        assert_eq!(colors.iter().filter(|&&c| c == PROPOSAL_COLOR).count(), 7);
    }
}
