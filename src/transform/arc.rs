//! Arc geometry and arc reprojection strategies.

use std::f64::consts::{PI, TAU};

use tracing::debug;

use crate::config::{
    ArcMode, ConvertOptions, ARC_RADIUS_TOLERANCE, EPS, MAX_ARC_SEGMENTS, MIN_ARC_SEGMENTS,
};
use crate::error::{ConvertError, Result};
use crate::model::{ArcDirection, ArcWords, Command, CommandKind, Position};

/// Arc in the XZ plane, resolved from its words.
///
/// Angles are measured with `atan2(dz, dx)` around the center. A clockwise
/// arc (G2, viewed from +Y) has a positive sweep in that frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPath {
    pub center: Position,
    pub start_radius: f64,
    /// Differs from `start_radius` for spiral arcs.
    pub end_radius: f64,
    pub start_angle: f64,
    /// Signed sweep in radians.
    pub sweep: f64,
}

fn angle_of(center: Position, p: Position) -> f64 {
    (p.z - center.z).atan2(p.x - center.x)
}

/// Center of an R-format arc.
fn center_from_radius(
    start: Position,
    end: Position,
    r: f64,
    direction: ArcDirection,
) -> std::result::Result<Position, String> {
    let chord = start.distance(&end);
    if chord < EPS {
        return Err("full circle needs center offsets, not R".to_string());
    }
    let half = chord / 2.0;
    let radius = r.abs();
    if radius < half - ARC_RADIUS_TOLERANCE {
        return Err(format!(
            "radius {} is shorter than half the chord ({:.4})",
            radius, half
        ));
    }

    let h = (radius * radius - half * half).max(0.0).sqrt();
    let ux = (end.x - start.x) / chord;
    let uz = (end.z - start.z) / chord;
    let mut side = match direction {
        ArcDirection::Clockwise => 1.0,
        ArcDirection::CounterClockwise => -1.0,
    };
    // Negative R selects the long way round
    if r < 0.0 {
        side = -side;
    }

    Ok(Position::new(
        (start.x + end.x) / 2.0 - side * h * uz,
        (start.z + end.z) / 2.0 + side * h * ux,
    ))
}

impl ArcPath {
    /// Resolve an arc from `start` to `end`.
    ///
    /// Offsets win for the center; an R given alongside them must agree with
    /// the offset radius. Equal start and end with offsets is a full circle.
    pub fn resolve(
        start: Position,
        end: Position,
        words: &ArcWords,
        direction: ArcDirection,
    ) -> std::result::Result<Self, String> {
        let center = if words.has_offsets() {
            let center = Position::new(
                start.x + words.i.unwrap_or(0.0),
                start.z + words.k.unwrap_or(0.0),
            );
            if let Some(r) = words.r {
                let offset_radius = start.distance(&center);
                if (r.abs() - offset_radius).abs() > ARC_RADIUS_TOLERANCE {
                    return Err(format!(
                        "radius {} disagrees with center offsets (radius {:.4})",
                        r.abs(),
                        offset_radius
                    ));
                }
            }
            center
        } else {
            match words.r {
                Some(r) if r.abs() < EPS => return Err("zero-radius arc".to_string()),
                Some(r) => center_from_radius(start, end, r, direction)?,
                None => return Err("arc needs a radius (R) or center offsets (I/K)".to_string()),
            }
        };

        let start_radius = start.distance(&center);
        let end_radius = end.distance(&center);
        if start_radius < EPS || end_radius < EPS {
            return Err("zero-radius arc".to_string());
        }

        let start_angle = angle_of(center, start);
        let end_angle = angle_of(center, end);
        // Only offsets can describe a whole turn; R-format full circles were
        // refused above. Short sweeps stay short.
        let full_circle = words.has_offsets() && start.distance(&end) < EPS;
        let turn = |a: f64| if full_circle { TAU } else { a };
        let sweep = match direction {
            ArcDirection::Clockwise => turn((end_angle - start_angle).rem_euclid(TAU)),
            ArcDirection::CounterClockwise => -turn((start_angle - end_angle).rem_euclid(TAU)),
        };

        Ok(Self {
            center,
            start_radius,
            end_radius,
            start_angle,
            sweep,
        })
    }

    /// Whether the radius changes along the arc.
    pub fn is_spiral(&self) -> bool {
        (self.end_radius - self.start_radius).abs() > ARC_RADIUS_TOLERANCE
    }

    /// Point at parameter `t` in `[0, 1]` along the arc.
    pub fn point_at(&self, t: f64) -> Position {
        let angle = self.start_angle + self.sweep * t;
        let radius = self.start_radius + (self.end_radius - self.start_radius) * t;
        Position::new(
            self.center.x + radius * angle.cos(),
            self.center.z + radius * angle.sin(),
        )
    }

    /// Segments needed to stay within `tolerance` of the arc.
    pub fn segment_count(&self, tolerance: f64) -> usize {
        // A changing radius bends a spiral harder than the circle it spans
        let radius = self.start_radius.max(self.end_radius)
            + (self.end_radius - self.start_radius).abs();
        let step = if tolerance >= radius {
            PI
        } else {
            2.0 * (1.0 - tolerance / radius).acos()
        };
        let count = (self.sweep.abs() / step).ceil();
        if count.is_finite() && count < usize::MAX as f64 {
            (count as usize).max(MIN_ARC_SEGMENTS)
        } else {
            usize::MAX
        }
    }

    /// End points of `count` segments; the last is `end` exactly.
    pub fn points(&self, count: usize, end: Position) -> Vec<Position> {
        let mut points: Vec<Position> = (1..count)
            .map(|i| self.point_at(i as f64 / count as f64))
            .collect();
        points.push(end);
        points
    }
}

/// Strategy for arcs on a machine that cannot interpolate them in the
/// rotary plane.
pub trait ArcStrategy {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// End points of the linear moves that replace the arc, in program
    /// coordinates (absolute).
    fn reproject(&self, cmd: &Command) -> Result<Vec<Position>>;
}

/// Refuse every arc.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectArcs;

impl ArcStrategy for RejectArcs {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn reproject(&self, cmd: &Command) -> Result<Vec<Position>> {
        Err(ConvertError::UnsupportedGeometry {
            line: cmd.line,
            message: "arcs are not supported with the reject strategy".to_string(),
        })
    }
}

/// Replace arcs by chords within a tolerance.
#[derive(Debug, Clone, Copy)]
pub struct SegmentArcs {
    pub tolerance: f64,
}

impl ArcStrategy for SegmentArcs {
    fn name(&self) -> &'static str {
        "segment"
    }

    fn reproject(&self, cmd: &Command) -> Result<Vec<Position>> {
        let direction = match cmd.kind {
            CommandKind::ArcMove(direction) => direction,
            _ => return Ok(vec![cmd.end()]),
        };
        let path = ArcPath::resolve(cmd.start, cmd.end(), &cmd.arc, direction).map_err(
            |message| ConvertError::Geometry {
                line: cmd.line,
                message,
            },
        )?;
        if path.is_spiral() {
            debug!(
                "Line {}: spiral arc, radius {:.4} to {:.4}",
                cmd.line, path.start_radius, path.end_radius
            );
        }

        let count = path.segment_count(self.tolerance);
        if count > MAX_ARC_SEGMENTS {
            return Err(ConvertError::UnsupportedGeometry {
                line: cmd.line,
                message: format!(
                    "arc needs {} segments, limit is {}",
                    count, MAX_ARC_SEGMENTS
                ),
            });
        }
        Ok(path.points(count, cmd.end()))
    }
}

/// Build the configured arc strategy.
pub fn strategy_for(options: &ConvertOptions) -> Box<dyn ArcStrategy> {
    match options.arcs {
        ArcMode::Segment => Box::new(SegmentArcs {
            tolerance: options.arc_tolerance,
        }),
        ArcMode::Reject => Box::new(RejectArcs),
    }
}
