use crate::chart::SummaryChart;
use crate::data::Datasets;
use crate::map::{Category, Label, LayerRegistry, MapRenderer, Viewport};
use crate::proposal::{IdGenerator, Proposal};
use crate::store::{KeyValueStore, ProposalStore, StoreError};
use crate::ui::{self, ScreenLayout};
use crate::workflow::{Effect, FormField, ProposalSink, ProposalWorkflow, WorkflowEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{info, warn};

/// Everything a committed proposal touches: the store, the overlays and the
/// summary chart
pub struct ShadeData {
    pub store: ProposalStore<Box<dyn KeyValueStore>>,
    pub registry: LayerRegistry,
    pub chart: SummaryChart,
    tree_count: usize,
    structure_count: usize,
}

impl ShadeData {
    pub fn new(store: ProposalStore<Box<dyn KeyValueStore>>, datasets: &Datasets) -> Self {
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Trees, &datasets.trees);
        registry.populate(Category::Structures, &datasets.structures);
        registry.populate(Category::HeatZones, &datasets.heat_zones);
        registry.load_proposals(&store.list());

        let mut data = Self {
            store,
            registry,
            chart: SummaryChart::new(),
            tree_count: datasets.trees.features.len(),
            structure_count: datasets.structures.features.len(),
        };
        data.refresh_summary();
        data
    }
}

impl ProposalSink for ShadeData {
    fn commit(&mut self, proposal: &Proposal) -> Result<(), StoreError> {
        self.store.add(proposal.clone())?;
        self.registry.add_proposal(proposal);
        Ok(())
    }

    fn refresh_summary(&mut self) {
        let proposals = self.store.list().len();
        self.chart
            .refresh(self.tree_count, self.structure_count, proposals);
    }
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    /// Initial view, restored by reset
    home: Viewport,
    pub map_renderer: MapRenderer,
    pub data: ShadeData,
    pub workflow: ProposalWorkflow,
    pub layout: ScreenLayout,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position
    pub mouse_pos: Option<(u16, u16)>,
    /// Dragging the candidate pin instead of the map
    dragging_candidate: bool,
    /// Details of the feature last clicked
    pub popup: Option<Label>,
    /// Blocking notification; swallows the next key press
    pub notice: Option<String>,
    /// Transient status bar message
    pub status: Option<String>,
}

impl App {
    pub fn new(
        width: u16,
        height: u16,
        center: (f64, f64),
        zoom: f64,
        store: ProposalStore<Box<dyn KeyValueStore>>,
        datasets: &Datasets,
    ) -> Self {
        let data = ShadeData::new(store, datasets);
        let existing = data.store.list();
        let workflow = ProposalWorkflow::new(IdGenerator::seeded(existing.iter().map(|p| p.id.as_str())));

        let layout = ui::screen_layout(Rect::new(0, 0, width, height));
        let viewport = Viewport::new(
            center.1,
            center.0,
            zoom,
            layout.map_inner.width as usize * 2,
            layout.map_inner.height as usize * 4,
        );

        Self {
            home: viewport.clone(),
            viewport,
            map_renderer: MapRenderer::new(),
            data,
            workflow,
            layout,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragging_candidate: false,
            popup: None,
            notice: None,
            status: None,
        }
    }

    /// Update layout and viewport size when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.layout = ui::screen_layout(Rect::new(0, 0, width, height));
        // Braille gives 2x4 pixels per character
        self.viewport.width = self.layout.map_inner.width as usize * 2;
        self.viewport.height = self.layout.map_inner.height as usize * 4;
        self.home.width = self.viewport.width;
        self.home.height = self.viewport.height;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.viewport = self.home.clone();
    }

    pub fn zoom_level(&self) -> String {
        format!("z{:.0}", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format_coords(self.viewport.center_lat, self.viewport.center_lon)
    }

    /// Geographic position under the mouse, if it is over the map
    pub fn pointer_coords(&self) -> Option<String> {
        let (col, row) = self.mouse_pos?;
        let (px, py) = self.map_pixel(col, row)?;
        let (lon, lat) = self.viewport.unproject(px, py);
        Some(format_coords(lat, lon))
    }

    /// Terminal cell to map pixel (center of the cell's dot grid)
    pub fn map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let inner = self.layout.map_inner;
        if !ui::contains(inner, col, row) {
            return None;
        }
        let px = (col - inner.x) as i32 * 2 + 1;
        let py = (row - inner.y) as i32 * 4 + 2;
        Some((px, py))
    }

    /// Terminal cell holding the candidate pin tip
    pub fn candidate_cell(&self) -> Option<(u16, u16)> {
        let candidate = self.workflow.candidate()?;
        let (px, py) = self.viewport.project(candidate.lng, candidate.lat);
        let inner = self.layout.map_inner;
        // Range-check in pixel space; far off-screen pins exceed u16
        let (dx, dy) = (px / 2, py / 4);
        if px < 0 || py < 0 || dx >= inner.width as i32 || dy >= inner.height as i32 {
            return None;
        }
        Some((inner.x + dx as u16, inner.y + dy as u16))
    }

    pub fn toggle_layer(&mut self, category: Category) {
        self.data.registry.toggle(category);
        // Popup may belong to a feature that just disappeared
        self.popup = None;
    }

    pub fn dispatch(&mut self, event: WorkflowEvent) {
        let effect = self.workflow.dispatch(event, &mut self.data);
        self.apply_effect(effect);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Ignored | Effect::CandidateMoved(_) => {}
            Effect::Armed => {
                self.popup = None;
                self.status = Some("Click the map where shade is needed".into());
            }
            Effect::Disarmed | Effect::Cancelled => {
                self.dragging_candidate = false;
                self.status = None;
            }
            Effect::Reviewing(_) => {
                self.status = None;
            }
            Effect::Rejected(e) => {
                warn!(error = %e, "proposal rejected");
                self.notice = Some(e.to_string());
            }
            Effect::Committed(proposal) => {
                self.dragging_candidate = false;
                self.status = Some(format!("Saved \"{}\"", proposal.name));
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.notice.take().is_some() {
            return;
        }
        if self.workflow.is_reviewing() {
            self.handle_form_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => {
                if self.workflow.is_armed() {
                    self.dispatch(WorkflowEvent::Cancel);
                } else if self.popup.is_some() {
                    self.popup = None;
                } else {
                    self.quit();
                }
            }

            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                self.toggle_layer(Category::CONTROLS[idx]);
            }
            KeyCode::Char('a') | KeyCode::Char('A') => self.dispatch(WorkflowEvent::Arm),

            // Pan with hjkl or arrow keys
            KeyCode::Left | KeyCode::Char('h') => self.pan(-10, 0),
            KeyCode::Right | KeyCode::Char('l') => self.pan(10, 0),
            KeyCode::Up | KeyCode::Char('k') => self.pan(0, -8),
            KeyCode::Down | KeyCode::Char('j') => self.pan(0, 8),

            KeyCode::Char('+') | KeyCode::Char('=') => self.viewport.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => self.viewport.zoom_out(),

            KeyCode::Char('g') | KeyCode::Char('G') => {
                let settings = &mut self.map_renderer.settings;
                settings.show_graticule = !settings.show_graticule;
            }
            KeyCode::Char('r') | KeyCode::Char('0') => self.reset_view(),

            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return self.dispatch(WorkflowEvent::Cancel),
            KeyCode::Enter => return self.dispatch(WorkflowEvent::Submit),
            _ => {}
        }

        let form = self.workflow.form_mut();
        match key.code {
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_prev(),
            KeyCode::Left if form.focus == FormField::Type => form.cycle_type(false),
            KeyCode::Right if form.focus == FormField::Type => form.cycle_type(true),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => form.insert_char(c),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        self.mouse_pos = Some((mouse.column, mouse.row));
        if self.notice.is_some() {
            return;
        }

        let (col, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                if let Some((px, py)) = self.map_pixel(col, row) {
                    self.viewport.zoom_in_at(px, py);
                }
            }
            MouseEventKind::ScrollDown => {
                if let Some((px, py)) = self.map_pixel(col, row) {
                    self.viewport.zoom_out_at(px, py);
                }
            }
            MouseEventKind::ScrollLeft => self.pan(-15, 0),
            MouseEventKind::ScrollRight => self.pan(15, 0),
            MouseEventKind::Down(MouseButton::Left) => self.handle_click(col, row),
            MouseEventKind::Drag(MouseButton::Left) => self.handle_drag(col, row),
            MouseEventKind::Up(MouseButton::Left) => {
                self.last_mouse = None;
                self.dragging_candidate = false;
            }
            _ => {}
        }
    }

    fn handle_click(&mut self, col: u16, row: u16) {
        if self.workflow.is_reviewing() {
            let modal = ui::modal_layout(self.layout.map_inner, self.candidate_cell().map(|(c, _)| c));
            if ui::contains(modal.save, col, row) {
                self.dispatch(WorkflowEvent::Submit);
                return;
            }
            if ui::contains(modal.cancel, col, row) || ui::contains(modal.close, col, row) {
                self.dispatch(WorkflowEvent::Cancel);
                return;
            }
            if ui::contains(modal.area, col, row) {
                return;
            }
            if self.near_candidate(col, row) {
                self.dragging_candidate = true;
                return;
            }
        }

        if let Some(idx) = self
            .layout
            .layer_rows
            .iter()
            .position(|r| ui::contains(*r, col, row))
        {
            self.toggle_layer(Category::CONTROLS[idx]);
            return;
        }
        if ui::contains(self.layout.add_button, col, row) {
            self.dispatch(WorkflowEvent::Arm);
            return;
        }

        let Some((px, py)) = self.map_pixel(col, row) else {
            return;
        };
        let (lng, lat) = self.viewport.unproject(px, py);

        if self.workflow.is_armed() && !self.workflow.is_reviewing() {
            // The armed click belongs to the workflow alone
            info!(lat, lng, "pin placed");
            self.dispatch(WorkflowEvent::MapClick { lat, lng });
            return;
        }

        if !self.workflow.is_reviewing() {
            self.popup = self.data.registry.hit_test(&self.viewport, px, py).cloned();
        }
        self.last_mouse = Some((col, row));
    }

    /// Pin head spans a couple of cells above its tip
    fn near_candidate(&self, col: u16, row: u16) -> bool {
        self.candidate_cell().is_some_and(|(c, r)| {
            col.abs_diff(c) <= 1 && row <= r && r - row <= 2
        })
    }

    fn handle_drag(&mut self, col: u16, row: u16) {
        if self.dragging_candidate {
            if let Some((px, py)) = self.map_pixel(col, row) {
                let (lng, lat) = self.viewport.unproject(px, py);
                self.dispatch(WorkflowEvent::MoveCandidate { lat, lng });
            }
            return;
        }

        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - col as i32) * 2;
            let dy = (last_y as i32 - row as i32) * 4;
            self.pan(dx, dy);
            self.last_mouse = Some((col, row));
        }
    }
}

fn format_coords(lat: f64, lon: f64) -> String {
    format!(
        "{:.4}°{}, {:.4}°{}",
        lat.abs(),
        if lat >= 0.0 { "N" } else { "S" },
        lon.abs(),
        if lon >= 0.0 { "E" } else { "W" }
    )
}
