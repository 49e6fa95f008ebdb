//! Built-in office building map.
//!
//! Twenty-five regions on a single floor with two exit regions: the
//! courtyard on the west side and the yard on the east side. Interest
//! points are hide spots spread over the work areas plus one exit point
//! in each exit region. Geometry is in meters, with `y` up.

use evac_types::{Bounds, Point3};

use crate::error::WorldError;
use crate::interest_points::{InterestPoint, InterestPointIndex};
use crate::region::Region;
use crate::region_graph::RegionGraph;

/// Ceiling height shared by every region.
const FLOOR_HEIGHT: f64 = 3.0;

/// Height at which interest points sit above the floor.
const POINT_HEIGHT: f64 = 0.5;

/// Helper to build a floor-level [`Region`] from its footprint.
fn region(
    id: &str,
    description: &str,
    center: (f64, f64),
    size: (f64, f64),
    neighbors: &[&str],
) -> Region {
    let bounds = Bounds::from_center_size(
        Point3::new(center.0, FLOOR_HEIGHT / 2.0, center.1),
        Point3::new(size.0, FLOOR_HEIGHT, size.1),
    );
    Region::new(id, description, bounds).with_neighbors(neighbors.iter().copied())
}

/// Helper to build a hide spot at floor level.
fn hide(id: &str, description: &str, x: f64, z: f64) -> InterestPoint {
    InterestPoint::hide_spot(id, description, Point3::new(x, POINT_HEIGHT, z))
}

/// Region keys of the two exits, in declaration order.
pub const OFFICE_EXITS: [&str; 2] = ["far_right_yard", "outside_courtyard"];

/// Region where the shooter appears in the default scenario.
pub const SHOOTER_REGION: &str = "hallway2";

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_lines)]
fn office_regions() -> Vec<Region> {
    vec![
        region(
            "entrance_hall",
            "Main lobby connecting the main entrance to the office building",
            (0.0, 5.0),
            (12.0, 10.0),
            &["reception_desk", "entrance_chatting_area1", "entrance_chatting_area2", "hallway1"],
        ),
        region(
            "reception_desk",
            "Front desk where visitors check in and receive visitor badges",
            (10.0, 5.0),
            (8.0, 10.0),
            &["entrance_hall", "cafeteria"],
        ),
        region(
            "entrance_chatting_area1",
            "Small lounge area near the entrance for informal meetings",
            (-10.0, 5.0),
            (8.0, 10.0),
            &["entrance_hall", "entrance_chatting_area2", "hallway3"],
        ),
        region(
            "entrance_chatting_area2",
            "Another lounge area near the entrance with comfortable seating",
            (-10.0, -4.0),
            (8.0, 8.0),
            &["entrance_hall", "entrance_chatting_area1"],
        ),
        region(
            "hallway1",
            "Main corridor connecting entrance to other office areas",
            (0.0, 20.0),
            (6.0, 20.0),
            &["entrance_hall", "cafeteria", "garden", "hallway2"],
        ),
        region(
            "cafeteria",
            "Large dining area for employees and visitors",
            (14.0, 17.0),
            (16.0, 14.0),
            &["reception_desk", "hallway1", "cafeteria_kitchen"],
        ),
        region(
            "cafeteria_kitchen",
            "Kitchen area where meals are prepared for the cafeteria",
            (26.0, 17.0),
            (8.0, 14.0),
            &["cafeteria"],
        ),
        region(
            "garden",
            "Outdoor garden area with seating for breaks and informal meetings",
            (-11.5, 20.0),
            (17.0, 16.0),
            &["hallway1"],
        ),
        region(
            "hallway2",
            "Main hallway connecting office spaces and several exits",
            (5.0, 33.0),
            (70.0, 6.0),
            &[
                "hallway1",
                "hallway4",
                "hallway5",
                "meeting_rooms",
                "cubicles_area2",
                "cubicles_area3",
                "cubicles_area4",
                "cubicles_area5",
                "cubicles_area6",
                "cubicles_area7",
                "man_bathroom",
                "woman_bathroom",
                "conference_room",
                "far_right_yard",
            ],
        ),
        region(
            "meeting_rooms",
            "Conference room for team meetings and client presentations",
            (-25.0, 42.0),
            (10.0, 12.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area2",
            "Open office space with cubicles for employees",
            (-15.0, 42.0),
            (10.0, 12.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area3",
            "Open office space with cubicles for marketing team",
            (-5.0, 42.0),
            (10.0, 12.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area4",
            "Open office space with cubicles for sales team",
            (5.0, 42.0),
            (10.0, 12.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area5",
            "Open office space with cubicles for engineering team",
            (15.0, 42.0),
            (10.0, 12.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area6",
            "Open office space with cubicles for finance department",
            (9.0, 27.0),
            (10.0, 6.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area7",
            "Open office space with cubicles for HR department",
            (19.0, 27.0),
            (10.0, 6.0),
            &["hallway2"],
        ),
        region(
            "cubicles_area8",
            "Open office space with cubicles for HR department",
            (36.0, 42.0),
            (8.0, 12.0),
            &["hallway2"],
        ),
        region(
            "man_bathroom",
            "Men's restroom facilities",
            (27.0, 27.0),
            (6.0, 6.0),
            &["hallway2"],
        ),
        region(
            "woman_bathroom",
            "Women's restroom facilities",
            (33.0, 27.0),
            (6.0, 6.0),
            &["hallway2"],
        ),
        region(
            "conference_room",
            "Large meeting room for company-wide presentations",
            (26.0, 42.0),
            (12.0, 12.0),
            &["hallway2"],
        ),
        region(
            "hallway3",
            "Corridor connecting lounge area and outside courtyard",
            (-19.0, 5.0),
            (10.0, 6.0),
            &["entrance_chatting_area1", "outside_courtyard"],
        ),
        region(
            "hallway4",
            "Corridor connecting main office hallway, garden and the outside courtyard",
            (-33.0, 33.0),
            (6.0, 6.0),
            &["hallway2"],
        ),
        region(
            "hallway5",
            "Corridor in the main hallway",
            (43.0, 39.0),
            (6.0, 6.0),
            &["hallway2"],
        ),
        region(
            "far_right_yard",
            "East side exterior area of the building, with an emergency exit",
            (48.0, 23.0),
            (16.0, 14.0),
            &["hallway2"],
        )
        .as_exit(),
        region(
            "outside_courtyard",
            "Central outdoor courtyard with an exit to the parking lot",
            (-32.0, 5.0),
            (16.0, 18.0),
            &["hallway3"],
        )
        .as_exit(),
    ]
}

// ---------------------------------------------------------------------------
// Interest points
// ---------------------------------------------------------------------------

fn office_interest_points() -> Vec<InterestPoint> {
    vec![
        hide("hide_spot_reception_counter", "Behind the reception counter", 10.0, 3.0),
        hide("hide_spot_cafeteria_pantry", "Inside the cafeteria pantry", 18.0, 22.0),
        hide("hide_spot_cafeteria_tables", "Under the long cafeteria tables", 10.0, 14.0),
        hide("hide_spot_kitchen_freezer", "Walk-in freezer in the kitchen", 28.0, 20.0),
        hide("hide_spot_meeting_closet", "Storage closet in the meeting rooms", -28.0, 46.0),
        hide("hide_spot_cubicle2_desk", "Under a desk in cubicle area 2", -15.0, 44.0),
        hide("hide_spot_cubicle3_desk", "Under a desk in cubicle area 3", -5.0, 44.0),
        hide("hide_spot_cubicle4_desk", "Under a desk in cubicle area 4", 5.0, 44.0),
        hide("hide_spot_cubicle4_cabinet", "Behind the filing cabinets in cubicle area 4", 8.0, 46.0),
        hide("hide_spot_cubicle5_desk", "Under a desk in cubicle area 5", 15.0, 44.0),
        hide("hide_spot_cubicle6_desk", "Under a desk in cubicle area 6", 9.0, 28.0),
        hide("hide_spot_cubicle7_desk", "Under a desk in cubicle area 7", 19.0, 28.0),
        hide("hide_spot_cubicle8_desk", "Under a desk in cubicle area 8", 36.0, 44.0),
        hide("hide_spot_man_bathroom_stall", "Locked stall in the men's restroom", 27.0, 28.0),
        hide("hide_spot_woman_bathroom_stall", "Locked stall in the women's restroom", 33.0, 28.0),
        hide("hide_spot_conference_table", "Under the conference table", 26.0, 42.0),
        hide("hide_spot_conference_av_room", "Audio-visual room behind the conference room", 30.0, 46.0),
        hide("hide_spot_garden_shed", "Tool shed at the edge of the garden", -16.0, 25.0),
        InterestPoint::exit(
            "exit_far_right_yard",
            "Emergency exit door on the east side of the building",
            Point3::new(54.0, POINT_HEIGHT, 20.0),
        ),
        InterestPoint::exit(
            "exit_outside_courtyard",
            "Gate from the courtyard to the parking lot",
            Point3::new(-38.0, POINT_HEIGHT, 5.0),
        ),
    ]
}

/// Build the default office building.
///
/// # Errors
///
/// Returns [`WorldError`] if the built-in tables contain duplicate keys or
/// dangling adjacency entries.
pub fn office_building() -> Result<(RegionGraph, InterestPointIndex), WorldError> {
    let mut graph = RegionGraph::new();
    for r in office_regions() {
        graph.add_region(r)?;
    }
    graph.validate()?;

    let mut points = InterestPointIndex::new();
    for p in office_interest_points() {
        points.add(p)?;
    }

    Ok((graph, points))
}
