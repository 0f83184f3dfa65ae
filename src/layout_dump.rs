use crate::layout::BitfieldLayout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: i64,
    pub height: i64,
    pub lane_width: i64,
    pub step: f64,
    pub segments: Vec<SegmentDump>,
    pub lanes: Vec<LaneDump>,
}

#[derive(Debug, Serialize)]
pub struct SegmentDump {
    pub index: usize,
    pub bits: i64,
    pub name: Option<String>,
    pub attr: Option<String>,
    pub kind: Option<String>,
    pub lsb: i64,
    pub msb: i64,
    pub lsbm: i64,
    pub msbm: i64,
    pub implicit: bool,
}

#[derive(Debug, Serialize)]
pub struct LaneDump {
    pub index: i64,
    pub row: i64,
    pub spans: Vec<SpanDump>,
}

#[derive(Debug, Serialize)]
pub struct SpanDump {
    pub segment: usize,
    pub lsb: i64,
    pub msb: i64,
    pub lsbm: i64,
    pub msbm: i64,
}

impl LayoutDump {
    pub fn from_layout(layout: &BitfieldLayout<'_>) -> Self {
        let segments = layout
            .segments
            .iter()
            .enumerate()
            .map(|(index, seg)| SegmentDump {
                index,
                bits: seg.segment.bits,
                name: seg.segment.name.clone(),
                attr: seg.segment.attr.clone(),
                kind: seg.kind().map(ToString::to_string),
                lsb: seg.lsb,
                msb: seg.msb,
                lsbm: seg.lsbm,
                msbm: seg.msbm,
                implicit: seg.implicit,
            })
            .collect();

        let lane_count = layout.options.lanes();
        let lanes = (0..lane_count)
            .map(|index| LaneDump {
                index,
                row: crate::layout::lane_row(index, lane_count),
                spans: layout
                    .lane_spans(index)
                    .into_iter()
                    .map(|(segment, span)| SpanDump {
                        segment,
                        lsb: span.lsb,
                        msb: span.msb,
                        lsbm: span.lsbm,
                        msbm: span.msbm,
                    })
                    .collect(),
            })
            .collect();

        Self {
            width: layout.image_width(),
            height: layout.image_height(),
            lane_width: layout.lane_width(),
            step: layout.step(),
            segments,
            lanes,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &BitfieldLayout<'_>) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
