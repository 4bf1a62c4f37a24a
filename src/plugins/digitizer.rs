use crate::{
    core::{geo::Point, region::Region},
    rendering::surface::DrawSurface,
    Result,
};

/// Hooks of an external vector digitizer attached to the canvas.
///
/// While [`is_active`](Digitizer::is_active) returns true the canvas forwards
/// pointer-mode mouse events here instead of handling them itself, and asks
/// the digitizer to redraw the edited layer whenever a render pass requests it.
pub trait Digitizer: Send {
    fn name(&self) -> &str {
        "digitizer"
    }

    fn is_active(&self) -> bool;

    /// Redraws the edited vector layer onto its own surface
    fn draw(&mut self, surface: &mut DrawSurface, region: &Region) -> Result<()>;

    fn on_left_down(&mut self, _position: Point, _ctrl: bool, _region: &Region) -> Result<()> {
        Ok(())
    }
    fn on_left_up(&mut self, _position: Point, _region: &Region) -> Result<()> {
        Ok(())
    }
    fn on_right_down(&mut self, _position: Point, _region: &Region) -> Result<()> {
        Ok(())
    }
    fn on_right_up(&mut self, _position: Point, _region: &Region) -> Result<()> {
        Ok(())
    }
    fn on_mouse_moving(&mut self, _position: Point, _region: &Region) -> Result<()> {
        Ok(())
    }

    /// True while an edit (e.g. moving a selected line) draws its own feedback,
    /// so the canvas must not draw a rubber band
    fn suppresses_rubber_band(&self) -> bool {
        false
    }
}
