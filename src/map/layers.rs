//! Overlay groups: one independently toggleable group per data category.

use crate::map::geometry::{polygon_contains, polyline_near};
use crate::map::projection::Viewport;
use crate::proposal::Proposal;
use geojson::{Feature, FeatureCollection, Value};
use tracing::debug;

/// A geographic ring (sequence of lon/lat coordinates)
pub type Ring = Vec<(f64, f64)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Trees,
    Structures,
    HeatZones,
    Proposals,
}

impl Category {
    /// Back-to-front drawing order
    pub const ALL: [Category; 4] = [
        Category::HeatZones,
        Category::Trees,
        Category::Structures,
        Category::Proposals,
    ];

    /// Order of the checkbox rows, matching the `1`-`4` keys
    pub const CONTROLS: [Category; 4] = [
        Category::Trees,
        Category::Structures,
        Category::HeatZones,
        Category::Proposals,
    ];

    fn index(self) -> usize {
        match self {
            Category::HeatZones => 0,
            Category::Trees => 1,
            Category::Structures => 2,
            Category::Proposals => 3,
        }
    }

    /// Label used when a feature has no `name`
    pub fn default_label(self) -> &'static str {
        match self {
            Category::Trees => "Tree",
            Category::Structures => "Shade structure",
            Category::HeatZones => "Heat zone",
            Category::Proposals => "Proposed shade",
        }
    }

    /// Checkbox caption
    pub fn title(self) -> &'static str {
        match self {
            Category::Trees => "Existing trees",
            Category::Structures => "Shade structures",
            Category::HeatZones => "Heat zones",
            Category::Proposals => "Proposals",
        }
    }

    /// Point features of this category render as filled circles, otherwise pins
    fn marker_style(self) -> MarkerStyle {
        match self {
            Category::Trees => MarkerStyle::Circle,
            _ => MarkerStyle::Pin,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerStyle {
    Circle,
    Pin,
}

/// Popup text of a rendered feature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// One or more point markers (multi-point features keep a single child)
    Markers { style: MarkerStyle, points: Vec<(f64, f64)> },
    /// Filled, outlined polygons; each polygon is exterior ring then holes
    Region { polygons: Vec<Vec<Ring>> },
    /// Open polylines (paths, canopy corridors)
    Lines { lines: Vec<Ring> },
    /// Members of a geometry collection, drawn and hit as one feature
    Collection(Vec<Shape>),
}

/// A feature turned into something the renderer can draw
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedFeature {
    pub shape: Shape,
    pub label: Label,
}

/// All rendered features of one category plus its visibility
#[derive(Clone, Debug)]
pub struct OverlayGroup {
    pub category: Category,
    children: Vec<RenderedFeature>,
    visible: bool,
}

impl OverlayGroup {
    fn new(category: Category) -> Self {
        Self {
            category,
            children: Vec::new(),
            visible: true,
        }
    }

    pub fn children(&self) -> &[RenderedFeature] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// The four overlay groups shown over the base map
#[derive(Clone, Debug)]
pub struct LayerRegistry {
    groups: [OverlayGroup; 4],
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRegistry {
    /// Empty registry with every group visible
    pub fn new() -> Self {
        Self {
            groups: Category::ALL.map(OverlayGroup::new),
        }
    }

    pub fn group(&self, category: Category) -> &OverlayGroup {
        &self.groups[category.index()]
    }

    /// Groups in drawing order
    pub fn groups(&self) -> impl Iterator<Item = &OverlayGroup> {
        self.groups.iter()
    }

    /// Replace a group's children with the features of a collection.
    /// Features with no drawable geometry are skipped, so the child count can
    /// be lower than the collection length that the summary chart reports.
    pub fn populate(&mut self, category: Category, collection: &FeatureCollection) {
        let children: Vec<_> = collection
            .features
            .iter()
            .filter_map(|f| render_feature(category, f))
            .collect();

        let skipped = collection.features.len() - children.len();
        if skipped > 0 {
            debug!(?category, skipped, "features without point or polygon geometry");
        }
        self.groups[category.index()].children = children;
    }

    /// Add the permanent marker of a committed proposal
    pub fn add_proposal(&mut self, proposal: &Proposal) {
        self.groups[Category::Proposals.index()]
            .children
            .push(render_proposal(proposal));
    }

    /// Rebuild the proposals group from a store listing
    pub fn load_proposals(&mut self, proposals: &[Proposal]) {
        self.groups[Category::Proposals.index()].children =
            proposals.iter().rev().map(render_proposal).collect();
    }

    pub fn set_visible(&mut self, category: Category, visible: bool) {
        self.groups[category.index()].visible = visible;
    }

    pub fn toggle(&mut self, category: Category) {
        let group = &mut self.groups[category.index()];
        group.visible = !group.visible;
    }

    pub fn is_visible(&self, category: Category) -> bool {
        self.group(category).visible
    }

    /// Popup label of the top-most visible feature under a canvas pixel
    pub fn hit_test(&self, viewport: &Viewport, px: i32, py: i32) -> Option<&Label> {
        self.groups
            .iter()
            .rev()
            .filter(|g| g.visible)
            .flat_map(|g| g.children.iter().rev())
            .find(|child| shape_hit(&child.shape, viewport, px, py))
            .map(|child| &child.label)
    }
}

fn shape_hit(shape: &Shape, viewport: &Viewport, px: i32, py: i32) -> bool {
    match shape {
        Shape::Markers { style, points } => points.iter().any(|&(lon, lat)| {
            let (x, y) = viewport.project(lon, lat);
            let (dx, dy) = (px - x, py - y);
            match style {
                MarkerStyle::Circle => dx.abs() <= 2 && dy.abs() <= 2,
                // Pins stand above their anchor
                MarkerStyle::Pin => dx.abs() <= 2 && (-7..=1).contains(&dy),
            }
        }),
        Shape::Region { polygons } => polygons.iter().any(|rings| {
            let projected: Vec<Vec<(i32, i32)>> = rings
                .iter()
                .map(|ring| ring.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect())
                .collect();
            polygon_contains(&projected, px, py)
        }),
        Shape::Lines { lines } => lines.iter().any(|line| {
            let projected: Vec<(i32, i32)> =
                line.iter().map(|&(lon, lat)| viewport.project(lon, lat)).collect();
            polyline_near(&projected, px, py, 2.0)
        }),
        Shape::Collection(members) => members.iter().any(|m| shape_hit(m, viewport, px, py)),
    }
}

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_str())
}

fn feature_label(category: Category, feature: &Feature) -> Label {
    Label {
        title: property(feature, "name")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(category.default_label())
            .to_string(),
        description: property(feature, "description").unwrap_or("").to_string(),
    }
}

fn to_ring(coords: &[Vec<f64>]) -> Ring {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings.iter().map(|r| to_ring(r)).collect()
}

fn shape_of(category: Category, value: &Value) -> Option<Shape> {
    let shape = match value {
        Value::Point(c) if c.len() >= 2 => Shape::Markers {
            style: category.marker_style(),
            points: vec![(c[0], c[1])],
        },
        Value::MultiPoint(points) if !points.is_empty() => Shape::Markers {
            style: category.marker_style(),
            points: to_ring(points),
        },
        Value::LineString(line) if line.len() >= 2 => Shape::Lines {
            lines: vec![to_ring(line)],
        },
        Value::MultiLineString(lines) if !lines.is_empty() => Shape::Lines {
            lines: lines.iter().map(|l| to_ring(l)).collect(),
        },
        Value::Polygon(rings) if !rings.is_empty() => Shape::Region {
            polygons: vec![to_polygon(rings)],
        },
        Value::MultiPolygon(polygons) if !polygons.is_empty() => Shape::Region {
            polygons: polygons.iter().map(|p| to_polygon(p)).collect(),
        },
        Value::GeometryCollection(geometries) => {
            let members: Vec<Shape> = geometries
                .iter()
                .filter_map(|g| shape_of(category, &g.value))
                .collect();
            if members.is_empty() {
                return None;
            }
            Shape::Collection(members)
        }
        _ => return None,
    };
    Some(shape)
}

fn render_feature(category: Category, feature: &Feature) -> Option<RenderedFeature> {
    let geometry = feature.geometry.as_ref()?;
    Some(RenderedFeature {
        shape: shape_of(category, &geometry.value)?,
        label: feature_label(category, feature),
    })
}

fn render_proposal(proposal: &Proposal) -> RenderedFeature {
    let title = if proposal.name.trim().is_empty() {
        Category::Proposals.default_label().to_string()
    } else {
        proposal.name.clone()
    };
    let description = if proposal.desc.is_empty() {
        format!("{} at {:.4}, {:.4}", proposal.kind, proposal.lat, proposal.lng)
    } else {
        format!(
            "{}: {} ({:.4}, {:.4})",
            proposal.kind, proposal.desc, proposal.lat, proposal.lng
        )
    };
    RenderedFeature {
        shape: Shape::Markers {
            style: MarkerStyle::Pin,
            points: vec![(proposal.lng, proposal.lat)],
        },
        label: Label { title, description },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::ShadeType;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn collection(json: &str) -> FeatureCollection {
        let geojson: geojson::GeoJson = json.parse().unwrap();
        FeatureCollection::try_from(geojson).unwrap()
    }

    fn points(n: usize) -> FeatureCollection {
        let features: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},32.2]}},"properties":{{}}}}"#,
                    -110.9 - i as f64 * 0.01
                )
            })
            .collect();
        collection(&format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        ))
    }

    #[test]
    fn test_child_count_matches_features() {
        for n in [0, 1, 25] {
            let mut registry = LayerRegistry::new();
            registry.populate(Category::Trees, &points(n));
            assert_eq!(registry.group(Category::Trees).len(), n);
            assert!(registry.group(Category::Structures).is_empty());
        }
    }

    #[test]
    fn test_marker_styles_per_category() {
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Trees, &points(1));
        registry.populate(Category::Structures, &points(1));
        let style = |c| match &registry.group(c).children()[0].shape {
            Shape::Markers { style, .. } => *style,
            _ => panic!("expected marker"),
        };
        assert_eq!(style(Category::Trees), MarkerStyle::Circle);
        assert_eq!(style(Category::Structures), MarkerStyle::Pin);
    }

    #[test]
    fn test_labels_fall_back_to_category_default() {
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},
                 "properties":{"name":"Reid Park","description":"Ramadas"}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":null}
            ]}"#,
        );
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Structures, &fc);
        let labels: Vec<_> = registry
            .group(Category::Structures)
            .children()
            .iter()
            .map(|c| c.label.clone())
            .collect();
        assert_eq!(
            labels,
            vec![
                Label {
                    title: "Reid Park".into(),
                    description: "Ramadas".into()
                },
                Label {
                    title: "Shade structure".into(),
                    description: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_polygons_become_regions() {
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"Downtown"},"geometry":{"type":"Polygon",
                 "coordinates":[[[-111.0,32.2],[-110.9,32.2],[-110.9,32.3],[-111.0,32.3],[-111.0,32.2]]]}}
            ]}"#,
        );
        let mut registry = LayerRegistry::new();
        registry.populate(Category::HeatZones, &fc);
        let group = registry.group(Category::HeatZones);
        assert_eq!(group.len(), 1);
        assert!(matches!(group.children()[0].shape, Shape::Region { .. }));
    }

    #[test]
    fn test_lines_and_collections_are_kept() {
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"Stone Ave"},"geometry":{"type":"LineString",
                 "coordinates":[[-110.97,32.21],[-110.97,32.24]]}},
                {"type":"Feature","properties":{},"geometry":{"type":"GeometryCollection","geometries":[
                    {"type":"Point","coordinates":[-110.95,32.23]},
                    {"type":"MultiLineString","coordinates":[[[-110.96,32.22],[-110.95,32.22]]]}
                ]}},
                {"type":"Feature","properties":{},"geometry":{"type":"GeometryCollection","geometries":[]}},
                {"type":"Feature","properties":{},"geometry":null}
            ]}"#,
        );
        let mut registry = LayerRegistry::new();
        registry.populate(Category::HeatZones, &fc);
        let group = registry.group(Category::HeatZones);
        assert_eq!(group.len(), 2);
        assert!(matches!(group.children()[0].shape, Shape::Lines { .. }));
        let Shape::Collection(members) = &group.children()[1].shape else {
            panic!("expected collection");
        };
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_hit_test_on_line() {
        let vp = Viewport::new(-110.97, 32.225, 14.0, 200, 100);
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"name":"Stone Ave"},"geometry":{"type":"LineString",
                 "coordinates":[[-110.97,32.21],[-110.97,32.24]]}}
            ]}"#,
        );
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Structures, &fc);
        let (x, y) = vp.project(-110.97, 32.225);
        let hit = registry.hit_test(&vp, x + 1, y).map(|l| l.title.as_str());
        assert_eq!(hit, Some("Stone Ave"));
        assert_eq!(registry.hit_test(&vp, x + 20, y), None);
    }

    #[test]
    fn test_toggle_keeps_children() {
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Trees, &points(3));
        registry.toggle(Category::Trees);
        assert!(!registry.is_visible(Category::Trees));
        assert_eq!(registry.group(Category::Trees).len(), 3);

        registry.set_visible(Category::Trees, true);
        registry.set_visible(Category::Trees, true);
        assert!(registry.is_visible(Category::Trees));
        assert_eq!(registry.group(Category::Trees).len(), 3);
        assert!(registry.is_visible(Category::HeatZones));
    }

    #[test]
    fn test_hit_test_respects_visibility() {
        let vp = Viewport::new(-110.95, 32.23, 14.0, 200, 100);
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[-110.95,32.23]},
                 "properties":{"name":"Mesquite"}}
            ]}"#,
        );
        let mut registry = LayerRegistry::new();
        registry.populate(Category::Trees, &fc);

        let hit = registry.hit_test(&vp, 100, 50).map(|l| l.title.as_str());
        assert_eq!(hit, Some("Mesquite"));
        assert_eq!(registry.hit_test(&vp, 150, 10), None);

        registry.toggle(Category::Trees);
        assert_eq!(registry.hit_test(&vp, 100, 50), None);
    }

    #[test]
    fn test_proposals_load_oldest_first() {
        let make = |id: &str| Proposal {
            id: id.into(),
            name: id.into(),
            kind: ShadeType::Tree,
            desc: String::new(),
            lat: 32.2,
            lng: -110.9,
            created: Utc::now(),
        };
        let mut registry = LayerRegistry::new();
        registry.load_proposals(&[make("p_2"), make("p_1")]);
        registry.add_proposal(&make("p_3"));
        let titles: Vec<_> = registry
            .group(Category::Proposals)
            .children()
            .iter()
            .map(|c| c.label.title.as_str())
            .collect();
        assert_eq!(titles, vec!["p_1", "p_2", "p_3"]);
    }
}
