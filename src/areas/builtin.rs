//! Built-in theme tables and cluster templates.

use std::collections::BTreeSet;

use super::{AmbientEntry, AreaRules, ClusterTemplate, CONTAINER_CACHE_TEMPLATE};
use crate::geometry::Point;
use crate::objects::AppearanceTag::{self, *};

fn ambient(entries: &[(&str, AppearanceTag)]) -> Vec<AmbientEntry> {
    entries
        .iter()
        .map(|(descriptor, appearance)| AmbientEntry {
            descriptor: descriptor.to_string(),
            appearance: *appearance,
        })
        .collect()
}

fn points(coords: &[(f32, f32)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn allowed(tags: &[AppearanceTag]) -> BTreeSet<AppearanceTag> {
    tags.iter().copied().collect()
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(super) fn themes() -> Vec<AreaRules> {
    vec![
        AreaRules {
            theme: "park".into(),
            allowed_appearances: allowed(&[Weapon, Garment, Organic, Container]),
            ambient_catalog: ambient(&[
                ("pile of wet leaves", Organic),
                ("snapped branch", Organic),
                ("half-eaten sandwich", Organic),
                ("lost mitten", Garment),
                ("faded scarf on a fence post", Garment),
                ("wilted bouquet", Organic),
                ("pine cones", Organic),
            ]),
            container_catalog: names(&[
                "overflowing trash bin",
                "picnic cooler",
                "groundskeeper's locker",
                "donation drop box",
                "hollow tree stump",
            ]),
            landmarks: points(&[
                (0.08, 0.10),
                (0.50, 0.06),
                (0.92, 0.12),
                (0.06, 0.52),
                (0.94, 0.50),
                (0.10, 0.92),
                (0.52, 0.94),
                (0.90, 0.90),
            ]),
            cluster_anchors: points(&[
                (0.25, 0.25),
                (0.75, 0.25),
                (0.25, 0.75),
                (0.75, 0.75),
                (0.50, 0.50),
                (0.50, 0.25),
                (0.50, 0.75),
                (0.25, 0.50),
                (0.75, 0.50),
            ]),
            cluster_templates: names(&["struggle_scene", "shallow_grave", "discarded_bundle"]),
        },
        AreaRules {
            theme: "docks".into(),
            allowed_appearances: allowed(&[Weapon, Tool, Garment, Container]),
            ambient_catalog: ambient(&[
                ("coil of mooring rope", Tool),
                ("rusted shackle", Tool),
                ("oil-stained glove", Garment),
                ("torn tarpaulin", Garment),
                ("broken pallet slat", Tool),
                ("abandoned hard hat", Garment),
            ]),
            container_catalog: names(&[
                "shipping crate",
                "fish barrel",
                "tackle box",
                "dockmaster's footlocker",
                "rusted tool chest",
            ]),
            landmarks: points(&[
                (0.05, 0.08),
                (0.30, 0.05),
                (0.70, 0.05),
                (0.95, 0.08),
                (0.05, 0.92),
                (0.35, 0.95),
                (0.65, 0.95),
                (0.95, 0.92),
            ]),
            cluster_anchors: points(&[
                (0.20, 0.30),
                (0.50, 0.30),
                (0.80, 0.30),
                (0.20, 0.70),
                (0.50, 0.70),
                (0.80, 0.70),
                (0.35, 0.50),
                (0.65, 0.50),
            ]),
            cluster_templates: names(&["drag_marks", "struggle_scene", "lookout_post"]),
        },
        AreaRules {
            theme: "alley".into(),
            allowed_appearances: allowed(&[Weapon, Garment, Tool, Organic, Container]),
            ambient_catalog: ambient(&[
                ("crushed soda can", Tool),
                ("soggy newspaper", Organic),
                ("discarded takeout box", Organic),
                ("single worn sneaker", Garment),
                ("bent coat hanger", Tool),
                ("rain-soaked cardboard", Organic),
            ]),
            container_catalog: names(&[
                "dumpster",
                "recycling bin",
                "milk crate stack",
                "fire escape storage box",
            ]),
            landmarks: points(&[
                (0.05, 0.05),
                (0.05, 0.35),
                (0.05, 0.65),
                (0.05, 0.95),
                (0.95, 0.05),
                (0.95, 0.35),
                (0.95, 0.65),
                (0.95, 0.95),
            ]),
            cluster_anchors: points(&[
                (0.35, 0.15),
                (0.65, 0.15),
                (0.35, 0.40),
                (0.65, 0.40),
                (0.35, 0.65),
                (0.65, 0.65),
                (0.50, 0.88),
            ]),
            cluster_templates: names(&["drag_marks", "discarded_bundle", "struggle_scene"]),
        },
        AreaRules {
            theme: "manor".into(),
            allowed_appearances: allowed(&[Weapon, Garment, Organic, Container]),
            ambient_catalog: ambient(&[
                ("vase of dried roses", Organic),
                ("folded dinner napkin", Garment),
                ("bowl of potpourri", Organic),
                ("velvet cushion", Garment),
                ("fruit bowl", Organic),
                ("silk shawl over a chair", Garment),
            ]),
            container_catalog: names(&[
                "writing desk drawer",
                "steamer trunk",
                "wardrobe",
                "locked jewelry box",
                "linen chest",
            ]),
            landmarks: points(&[
                (0.10, 0.10),
                (0.40, 0.08),
                (0.70, 0.10),
                (0.92, 0.30),
                (0.92, 0.70),
                (0.70, 0.92),
                (0.30, 0.92),
                (0.08, 0.60),
            ]),
            cluster_anchors: points(&[
                (0.30, 0.30),
                (0.60, 0.30),
                (0.30, 0.60),
                (0.60, 0.60),
                (0.45, 0.45),
                (0.78, 0.45),
                (0.45, 0.78),
            ]),
            cluster_templates: names(&["shallow_grave", "lookout_post", "struggle_scene"]),
        },
    ]
}

pub(super) fn cluster_templates() -> Vec<ClusterTemplate> {
    let template = |id: &str, description: &str, offsets: &[(f32, f32)]| ClusterTemplate {
        id: id.into(),
        description: description.into(),
        offsets: points(offsets),
    };

    vec![
        template(
            "struggle_scene",
            "Signs of a fight around a single spot",
            &[(0.0, 0.0), (18.0, -8.0), (-14.0, 12.0)],
        ),
        template(
            "shallow_grave",
            "Disturbed earth with items pressed into it",
            &[(-10.0, -10.0), (12.0, 6.0), (0.0, 22.0)],
        ),
        template(
            "discarded_bundle",
            "A hastily dropped bundle and what spilled from it",
            &[(0.0, 0.0), (22.0, 0.0)],
        ),
        template(
            "drag_marks",
            "A trail of objects along a drag path",
            &[(-24.0, 0.0), (-8.0, 4.0), (8.0, -4.0), (24.0, 0.0)],
        ),
        template(
            "lookout_post",
            "Where someone waited and watched",
            &[(0.0, -20.0), (16.0, 14.0), (-16.0, 14.0)],
        ),
        template(
            CONTAINER_CACHE_TEMPLATE,
            "Items pulled out of an opened container",
            &[(0.0, -18.0), (16.0, 10.0), (-16.0, 10.0)],
        ),
    ]
}
