//! Relative-position policy for extended screen pairs.

use serde::{Deserialize, Serialize};

use crate::screen::{Point, ScreenProperty};

/// Start positions of an extended screen pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairPositions {
    /// Main screen start
    pub main: Point,
    /// Secondary screen start
    pub secondary: Point,
}

impl PairPositions {
    /// Both screens at the origin (mirror)
    pub const MIRRORED: PairPositions = PairPositions {
        main: Point::ORIGIN,
        secondary: Point::ORIGIN,
    };
}

/// Default extended layout: secondary starts right past the main screen
pub fn default_extend_layout(main: &ScreenProperty) -> PairPositions {
    PairPositions {
        main: Point::ORIGIN,
        secondary: Point::new(dimension(main.width), 0),
    }
}

/// Whether two screens share an edge
///
/// Screens that only meet at a corner are not touching.
pub fn are_screens_touching(
    main: &ScreenProperty,
    secondary: &ScreenProperty,
    positions: PairPositions,
) -> bool {
    let (a, b) = (positions.main, positions.secondary);

    let horizontal_ab = a.x + dimension(main.width) == b.x;
    let horizontal_ba = b.x + dimension(secondary.width) == a.x;
    let vertical_ab = a.y + dimension(main.height) == b.y;
    let vertical_ba = b.y + dimension(secondary.height) == a.y;

    if (horizontal_ab && vertical_ab) || (horizontal_ba && vertical_ba) {
        return false;
    }
    horizontal_ab || horizontal_ba || vertical_ab || vertical_ba
}

/// Caller positions if they are edge-adjacent, the default layout otherwise
pub fn validated_or_default(
    main: &ScreenProperty,
    secondary: &ScreenProperty,
    requested: Option<PairPositions>,
) -> PairPositions {
    match requested {
        Some(positions) if are_screens_touching(main, secondary, positions) => positions,
        _ => default_extend_layout(main),
    }
}

fn dimension(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
