pub mod graphics;

pub use graphics::{
    CoordSpace, DrawStyle, GraphicsContext, GraphicsItem, GraphicsKind, GraphicsSet,
    GraphicsSetId, ItemId, LabelAlign,
};
