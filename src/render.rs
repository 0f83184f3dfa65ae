use crate::config::RenderOptions;
use crate::ir::Segment;
use crate::layout::render;
use crate::node::serialize;
use anyhow::Result;
use std::path::Path;

/// Lays out `segments` and serializes the diagram to SVG text.
pub fn render_svg(segments: &[Segment], options: &RenderOptions) -> String {
    serialize(&render(segments, options))
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}
