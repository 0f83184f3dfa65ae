#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod markup;
pub mod node;
pub mod render;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{OptionError, OptionName, OptionsSpec, RenderOptions, load_config};
pub use ir::{PlacedSegment, Register, Segment, SegmentKind, load_register, parse_register};
pub use layout::{BitfieldLayout, LaneSpan, render};
pub use markup::{TextRun, parse_rich_text};
pub use node::{AttrValue, Content, Node, serialize};
pub use render::{render_svg, write_output_svg};

/// Renders a register description (see [`parse_register`]) straight to SVG.
pub fn render_register(input: &str) -> anyhow::Result<String> {
    let register = parse_register(input)?;
    let options = register.options.build()?;
    Ok(render_svg(&register.segments, &options))
}
