pub mod labels;
pub mod normalize;
pub mod palette;
pub mod template;
pub mod types;

pub use labels::BucketMode;
pub use normalize::normalize;
pub use palette::ColorGenerator;
pub use types::{
    ChartData, ChartSpec, ChartType, DataPoint, Dataset, InputMode, Paint, Plugin, RawIntent,
    TemplateIntent,
};
