use crate::config::RenderOptions;
use crate::ir::{PlacedSegment, Segment, SegmentKind};
use crate::markup::tspans;
use crate::node::{AttrValue, Node};

/// Highlight hue per segment type, keyed by the type's string form.
const TYPE_HUES: [(&str, &str); 6] = [
    ("2", "0"),
    ("3", "80"),
    ("4", "170"),
    ("5", "45"),
    ("6", "126"),
    ("7", "215"),
];

const HIGHLIGHT_OPACITY: &str = "fill-opacity:0.1";
const LANE_OFFSET_X: f64 = 4.5;
const LANE_OFFSET_Y: f64 = 0.5;

/// Portion of a segment that falls inside one lane, clipped to the lane's
/// bit range. `lsbm`/`msbm` are columns counted from the lane's low end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneSpan {
    pub lsb: i64,
    pub msb: i64,
    pub lsbm: i64,
    pub msbm: i64,
}

impl LaneSpan {
    pub fn width(&self) -> i64 {
        self.msbm - self.lsbm + 1
    }
}

/// Register positions resolved against a set of options.
#[derive(Debug, Clone)]
pub struct BitfieldLayout<'a> {
    pub options: &'a RenderOptions,
    pub segments: Vec<PlacedSegment>,
}

impl<'a> BitfieldLayout<'a> {
    pub fn new(segments: &[Segment], options: &'a RenderOptions) -> Self {
        Self {
            options,
            segments: place_segments(segments, options),
        }
    }

    pub fn lane_width(&self) -> i64 {
        self.options.lane_width()
    }

    /// Horizontal distance between adjacent bit columns.
    pub fn step(&self) -> f64 {
        self.options.hspace() as f64 / self.lane_width() as f64
    }

    pub fn image_width(&self) -> i64 {
        self.options.hspace() + 9
    }

    pub fn image_height(&self) -> i64 {
        self.options.vspace() * self.options.lanes() + 5
    }

    /// Visible portions in `lane`, paired with the index of their segment.
    pub fn lane_spans(&self, lane: i64) -> Vec<(usize, LaneSpan)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(idx, seg)| {
                lane_span(seg, lane, self.lane_width()).map(|span| (idx, span))
            })
            .collect()
    }

    pub fn to_node(&self) -> Node {
        let width = self.image_width();
        let height = self.image_height();
        let lanes = (0..self.options.lanes())
            .map(|index| self.lane(index))
            .collect();
        Node::element("svg")
            .attr("xmlns", "http://www.w3.org/2000/svg")
            .attr("width", width)
            .attr("height", height)
            .attr("viewBox", format!("0 0 {width} {height}"))
            .with_children(lanes)
    }

    fn lane(&self, index: i64) -> Node {
        let row = lane_row(index, self.options.lanes());
        let y = (row * self.options.vspace()) as f64 + LANE_OFFSET_Y;
        Node::element("g")
            .attr("transform", translate(LANE_OFFSET_X, y))
            .with_children(vec![self.cage(index), self.labels(index)])
    }

    fn cage(&self, index: i64) -> Node {
        let vspace = self.options.vspace() as f64;
        let hspace = self.options.hspace();
        let lane_width = self.lane_width();
        let step = self.step();
        let full = vspace / 2.0;
        let stub = vspace / 16.0;

        let mut lines = vec![
            hline(hspace, None, None),
            vline(full, None, None),
            hline(hspace, Some(0), Some(full)),
        ];

        // Walk column boundaries from the lane's right (low) edge leftwards.
        let first_bit = index * lane_width;
        for offset in 0..lane_width {
            let bit = first_bit + offset;
            let x = (lane_width - offset) as f64 * step;
            let is_field_edge = offset == 0 || self.segments.iter().any(|seg| seg.lsb == bit);
            if is_field_edge {
                lines.push(vline(full, Some(x), None));
            } else {
                lines.push(vline(stub, Some(x), None));
                lines.push(vline(stub, Some(x), Some(full - stub)));
            }
        }

        Node::element("g")
            .attr("stroke", "black")
            .attr("stroke-width", 1)
            .attr("stroke-linecap", "round")
            .attr("transform", translate(0, vspace / 4.0))
            .with_children(lines)
    }

    fn labels(&self, index: i64) -> Node {
        let vspace = self.options.vspace() as f64;
        let lane_width = self.lane_width();
        let step = self.step();

        let mut blanks = Vec::new();
        let mut bits = Vec::new();
        let mut names = Vec::new();
        let mut attrs = Vec::new();

        let spans = self.lane_spans(index);
        for &(idx, span) in &spans {
            let seg = &self.segments[idx];
            tracing::trace!(lane = index, segment = idx, ?span, "lane span");
            let lsbm = span.lsbm as f64;
            let msbm = span.msbm as f64;

            let lsb_x = step * column(span.lsbm, lane_width) as f64;
            let msb_x = step * column(span.msbm, lane_width) as f64;
            bits.push(self.text_node(lsb_x).with_text(span.lsb.to_string()));
            if span.lsbm != span.msbm {
                bits.push(self.text_node(msb_x).with_text(span.msb.to_string()));
            }

            let center = step * (lane_width as f64 - (msbm + lsbm) / 2.0 - 1.0);
            if let Some(name) = seg.name() {
                names.push(self.text_node(center).with_children(tspans(name)));
            }
            if seg.name().is_none() || seg.kind().is_some() {
                let style = format!("{HIGHLIGHT_OPACITY}{}", type_style(seg.kind()));
                blanks.push(
                    Node::element("rect")
                        .attr("style", style)
                        .attr("x", msb_x)
                        .attr("y", 0)
                        .attr("width", step * (msbm - lsbm + 1.0))
                        .attr("height", vspace / 2.0),
                );
            }
            if let Some(attr) = seg.attr() {
                attrs.push(self.text_node(center).with_children(tspans(attr)));
            }
        }
        tracing::debug!(lane = index, spans = spans.len(), "lane labels");

        let half_step = step / 2.0;
        let layers = Node::element("g").with_children(vec![
            Node::element("g")
                .attr("transform", translate(0, vspace / 4.0))
                .with_children(blanks),
            Node::element("g")
                .attr("transform", translate(half_step, vspace / 5.0))
                .with_children(bits),
            Node::element("g")
                .attr("transform", translate(half_step, vspace / 2.0 + 4.0))
                .with_children(names),
            Node::element("g")
                .attr("transform", translate(half_step, self.options.vspace()))
                .with_children(attrs),
        ]);
        Node::element("g")
            .attr("text-anchor", "middle")
            .with_children(vec![layers])
    }

    fn text_node(&self, x: f64) -> Node {
        Node::element("text")
            .attr("x", x)
            .attr("font-size", self.options.fontsize())
            .attr("font-family", self.options.fontfamily())
            .attr("font-weight", self.options.fontweight())
    }
}

/// Lays the register out and returns the diagram tree.
pub fn render(segments: &[Segment], options: &RenderOptions) -> Node {
    BitfieldLayout::new(segments, options).to_node()
}

/// Assigns absolute and lane-relative positions in declaration order. When
/// the declared fields stop short of the register width, one unnamed
/// segment covers the remainder.
pub fn place_segments(segments: &[Segment], options: &RenderOptions) -> Vec<PlacedSegment> {
    let lane_width = options.lane_width();
    let mut placed = Vec::with_capacity(segments.len() + 1);
    let mut lsb = 0;
    for segment in segments {
        placed.push(place(segment.clone(), lsb, lane_width, false));
        lsb = lsb.saturating_add(segment.bits);
    }
    if lsb < options.bits() {
        let remainder = options.bits().saturating_sub(lsb);
        placed.push(place(Segment::new(remainder), lsb, lane_width, true));
    }
    tracing::debug!(
        declared = segments.len(),
        placed = placed.len(),
        covered = lsb,
        "placed segments"
    );
    placed
}

fn place(segment: Segment, lsb: i64, lane_width: i64, implicit: bool) -> PlacedSegment {
    // Positions saturate; fields pushed past i64 land outside every lane.
    let msb = lsb.saturating_add(segment.bits).saturating_sub(1);
    PlacedSegment {
        segment,
        lsb,
        msb,
        lsbm: lsb.rem_euclid(lane_width),
        msbm: msb.rem_euclid(lane_width),
        implicit,
    }
}

/// Clips `segment` to `lane`. Lanes between the segment's first and last
/// lane are covered entirely.
pub fn lane_span(segment: &PlacedSegment, lane: i64, lane_width: i64) -> Option<LaneSpan> {
    let first = segment.lsb.div_euclid(lane_width);
    let last = segment.msb.div_euclid(lane_width);
    if lane < first || lane > last {
        return None;
    }
    let (lsb, lsbm) = if first == lane {
        (segment.lsb, segment.lsbm)
    } else {
        (lane * lane_width, 0)
    };
    let (msb, msbm) = if last == lane {
        (segment.msb, segment.msbm)
    } else {
        ((lane + 1) * lane_width - 1, lane_width - 1)
    };
    Some(LaneSpan {
        lsb,
        msb,
        lsbm,
        msbm,
    })
}

/// Row a lane is drawn on, counted from the top. Lane 0 holds the lowest
/// bits and always sits on the bottom row.
pub fn lane_row(index: i64, lanes: i64) -> i64 {
    lanes - index - 1
}

/// Column of bit `position` within its lane; the lane's highest bit is
/// column 0, matching msb-on-the-left register drawings.
pub fn column(position: i64, lane_width: i64) -> i64 {
    lane_width - position.rem_euclid(lane_width) - 1
}

fn type_style(kind: Option<&SegmentKind>) -> String {
    let Some(kind) = kind else {
        return String::new();
    };
    let key = kind.to_string();
    TYPE_HUES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, hue)| format!(";fill:hsl({hue},100%,50%)"))
        .unwrap_or_default()
}

fn translate(x: impl Into<AttrValue>, y: impl Into<AttrValue>) -> String {
    format!("translate({}, {})", x.into(), y.into())
}

fn hline(len: i64, x: Option<i64>, y: Option<f64>) -> Node {
    let mut node = Node::element("line");
    if let Some(x) = x {
        node = node.attr("x1", x);
    }
    node = node.attr("x2", len);
    if let Some(y) = y {
        node = node.attr("y1", y).attr("y2", y);
    }
    node
}

fn vline(len: f64, x: Option<f64>, y: Option<f64>) -> Node {
    let mut node = Node::element("line");
    if let Some(x) = x {
        node = node.attr("x1", x).attr("x2", x);
    }
    match y {
        Some(y) => node.attr("y1", y).attr("y2", y + len),
        None => node.attr("y2", len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionsSpec;
    use crate::node::Content;

    fn options(hspace: i64, bits: i64, lanes: i64) -> RenderOptions {
        OptionsSpec {
            hspace: Some(hspace),
            bits: Some(bits),
            lanes: Some(lanes),
            ..OptionsSpec::default()
        }
        .build()
        .unwrap()
    }

    fn texts_of(node: &Node) -> Vec<String> {
        node.children()
            .iter()
            .filter_map(|child| child.text().map(str::to_string))
            .collect()
    }

    /// blanks, bits, names, attrs layers of one lane.
    fn layers(lane: &Node) -> &[Node] {
        lane.children()[1].children()[0].children()
    }

    #[test]
    fn positions_accumulate_in_declaration_order() {
        let opts = options(640, 32, 2);
        let placed = place_segments(
            &[Segment::named("a", 3), Segment::named("b", 10), Segment::new(19)],
            &opts,
        );
        assert_eq!(placed.len(), 3);
        assert_eq!((placed[0].lsb, placed[0].msb), (0, 2));
        assert_eq!((placed[1].lsb, placed[1].msb), (3, 12));
        assert_eq!((placed[2].lsb, placed[2].msb), (13, 31));
        assert_eq!((placed[2].lsbm, placed[2].msbm), (13, 15));
        assert!(placed.iter().all(|seg| !seg.implicit));
    }

    #[test]
    fn uncovered_bits_get_an_implicit_segment() {
        let opts = options(888, 16, 1);
        let placed = place_segments(&[Segment::named("IPO", 8)], &opts);
        assert_eq!(placed.len(), 2);
        assert!(placed[1].implicit);
        assert_eq!((placed[1].lsb, placed[1].msb), (8, 15));
        assert!(placed[1].name().is_none());
    }

    #[test]
    fn span_clips_to_each_lane() {
        let seg = place(Segment::named("wide", 40), 4, 16, false);
        assert_eq!(
            lane_span(&seg, 0, 16),
            Some(LaneSpan {
                lsb: 4,
                msb: 15,
                lsbm: 4,
                msbm: 15,
            })
        );
        assert_eq!(
            lane_span(&seg, 1, 16),
            Some(LaneSpan {
                lsb: 16,
                msb: 31,
                lsbm: 0,
                msbm: 15,
            })
        );
        assert_eq!(
            lane_span(&seg, 2, 16),
            Some(LaneSpan {
                lsb: 32,
                msb: 43,
                lsbm: 0,
                msbm: 11,
            })
        );
        assert_eq!(lane_span(&seg, 3, 16), None);
    }

    #[test]
    fn span_widths_add_up_to_segment_bits() {
        let opts = options(640, 64, 4);
        let segments = [
            Segment::named("a", 5),
            Segment::named("b", 20),
            Segment::named("c", 1),
            Segment::named("d", 38),
        ];
        let layout = BitfieldLayout::new(&segments, &opts);
        for (idx, seg) in segments.iter().enumerate() {
            let total: i64 = (0..opts.lanes())
                .flat_map(|lane| layout.lane_spans(lane))
                .filter(|(i, _)| *i == idx)
                .map(|(_, span)| span.width())
                .sum();
            assert_eq!(total, seg.bits, "segment {idx}");
        }
    }

    #[test]
    fn lanes_stack_bottom_up() {
        assert_eq!(lane_row(0, 4), 3);
        assert_eq!(lane_row(3, 4), 0);
        let opts = RenderOptions::default();
        let tree = render(&[Segment::named("x", 32)], &opts);
        let transforms: Vec<String> = tree
            .children()
            .iter()
            .map(|lane| lane.get_attr("transform").unwrap().to_string())
            .collect();
        assert_eq!(transforms, vec!["translate(4.5, 80.5)", "translate(4.5, 0.5)"]);
    }

    #[test]
    fn columns_run_right_to_left() {
        assert_eq!(column(0, 16), 15);
        assert_eq!(column(15, 16), 0);
        assert_eq!(column(17, 16), 14);
    }

    #[test]
    fn svg_root_is_sized_from_options() {
        let opts = options(888, 16, 1);
        let tree = render(&[], &opts);
        assert_eq!(tree.tag, "svg");
        assert_eq!(tree.get_attr("width"), Some(&AttrValue::Int(897)));
        assert_eq!(tree.get_attr("height"), Some(&AttrValue::Int(85)));
        assert_eq!(
            tree.get_attr("viewBox").map(ToString::to_string),
            Some("0 0 897 85".to_string())
        );
        assert_eq!(tree.children().len(), 1);
    }

    #[test]
    fn single_named_field_end_to_end() {
        let opts = options(888, 16, 1);
        let tree = render(&[Segment::named("IPO", 8).with_attr("RO")], &opts);
        let lane = &tree.children()[0];
        let layers = layers(lane);
        assert_eq!(layers.len(), 4);

        let bit_numbers = texts_of(&layers[1]);
        assert!(bit_numbers.contains(&"0".to_string()));
        assert!(bit_numbers.contains(&"7".to_string()));

        let names = layers[2].children();
        assert_eq!(names.len(), 1);
        let name_runs = names[0].children();
        assert_eq!(name_runs.len(), 1);
        assert_eq!(name_runs[0].text(), Some("IPO"));
        assert!(name_runs[0].attrs.is_empty());

        let attrs = layers[3].children();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].children()[0].text(), Some("RO"));

        // The uncovered upper half is highlighted, the named field is not.
        let blanks = layers[0].children();
        assert_eq!(blanks.len(), 1);
        assert_eq!(blanks[0].get_attr("x"), Some(&AttrValue::Float(0.0)));
        assert_eq!(blanks[0].get_attr("width"), Some(&AttrValue::Float(444.0)));
        assert_eq!(
            blanks[0].get_attr("style").map(ToString::to_string),
            Some("fill-opacity:0.1".to_string())
        );
    }

    #[test]
    fn single_bit_field_has_one_number() {
        let opts = options(640, 32, 1);
        let tree = render(&[Segment::named("en", 1), Segment::named("rest", 31)], &opts);
        let bit_numbers = texts_of(&layers(&tree.children()[0])[1]);
        assert_eq!(bit_numbers, vec!["0", "1", "31"]);
    }

    #[test]
    fn typed_field_gets_hue() {
        let opts = options(640, 32, 1);
        let tree = render(
            &[
                Segment::named("a", 8).with_kind(4),
                Segment::named("b", 8).with_kind("9"),
                Segment::named("c", 16),
            ],
            &opts,
        );
        let blanks = layers(&tree.children()[0])[0].children();
        let styles: Vec<String> = blanks
            .iter()
            .map(|rect| rect.get_attr("style").unwrap().to_string())
            .collect();
        assert_eq!(
            styles,
            vec!["fill-opacity:0.1;fill:hsl(170,100%,50%)", "fill-opacity:0.1"]
        );
    }

    #[test]
    fn cage_marks_field_edges_with_full_ticks() {
        let opts = options(640, 8, 1);
        let tree = render(&[Segment::named("lo", 4), Segment::named("hi", 4)], &opts);
        let cage = &tree.children()[0].children()[0];
        let lines = cage.children();
        // Two rails, the left border, then one entry per column boundary:
        // full ticks at the lane edge and bit 4, stub pairs elsewhere.
        assert_eq!(lines.len(), 3 + 2 + 6 * 2);
        let full: Vec<&Node> = lines[3..]
            .iter()
            .filter(|line| {
                line.get_attr("y2") == Some(&AttrValue::Float(40.0))
                    && line.get_attr("y1").is_none()
            })
            .collect();
        assert_eq!(full.len(), 2);
        assert_eq!(full[0].get_attr("x1"), Some(&AttrValue::Float(640.0)));
        assert_eq!(full[1].get_attr("x1"), Some(&AttrValue::Float(320.0)));
    }

    #[test]
    fn stubs_sit_on_top_and_bottom_rails() {
        let opts = options(640, 8, 1);
        let tree = render(&[Segment::named("all", 8)], &opts);
        let lines = tree.children()[0].children()[0].children();
        let top = &lines[4];
        let bottom = &lines[5];
        assert_eq!(top.get_attr("y2"), Some(&AttrValue::Float(5.0)));
        assert_eq!(bottom.get_attr("y1"), Some(&AttrValue::Float(35.0)));
        assert_eq!(bottom.get_attr("y2"), Some(&AttrValue::Float(40.0)));
    }

    #[test]
    fn names_carry_rich_text_runs() {
        let opts = options(640, 16, 1);
        let tree = render(&[Segment::named("<b>EN</b>able", 16)], &opts);
        let name = &layers(&tree.children()[0])[2].children()[0];
        let Content::Children(runs) = &name.content else {
            panic!("expected tspans");
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].get_attr("font-weight"), Some(&AttrValue::from("bold")));
        assert_eq!(runs[1].text(), Some("able"));
    }

    #[test]
    fn segments_outside_a_lane_add_nothing_to_it() {
        let opts = options(640, 32, 2);
        let segments = [Segment::named("lo", 16), Segment::named("hi", 16)];
        let layout = BitfieldLayout::new(&segments, &opts);
        let lane0: Vec<usize> = layout.lane_spans(0).into_iter().map(|(i, _)| i).collect();
        let lane1: Vec<usize> = layout.lane_spans(1).into_iter().map(|(i, _)| i).collect();
        assert_eq!(lane0, vec![0]);
        assert_eq!(lane1, vec![1]);
    }

    #[test]
    fn oversized_fields_saturate_instead_of_overflowing() {
        let opts = RenderOptions::default();
        let segments = [
            Segment::named("a", 8),
            Segment::named("b", i64::MAX),
            Segment::named("c", 4),
        ];
        let placed = place_segments(&segments, &opts);
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[1].lsb, 8);
        assert_eq!(placed[1].msb, i64::MAX - 1);
        assert_eq!(placed[2].lsb, i64::MAX);
        assert_eq!(placed[2].msb, i64::MAX - 1);

        let tree = render(&segments, &opts);
        assert_eq!(tree.children().len(), 2);
        // "b" fills every column from bit 8 up, "c" is never drawn.
        let layout = BitfieldLayout::new(&segments, &opts);
        let upper = LaneSpan {
            lsb: 16,
            msb: 31,
            lsbm: 0,
            msbm: 15,
        };
        assert_eq!(layout.lane_spans(1), vec![(1, upper)]);
    }

    #[test]
    fn hugely_negative_fields_still_fill_the_remainder() {
        let opts = RenderOptions::default();
        let placed = place_segments(&[Segment::new(i64::MIN), Segment::new(-1)], &opts);
        assert_eq!(placed[1].lsb, i64::MIN);
        let gap = placed.last().unwrap();
        assert!(gap.implicit);
        assert_eq!(gap.segment.bits, i64::MAX);
        let _ = render(&[Segment::new(i64::MIN), Segment::new(-1)], &opts);
    }

    #[test]
    fn rails_and_attr_row_use_integer_coordinates() {
        let opts = options(888, 16, 1);
        let tree = render(&[Segment::named("IPO", 8).with_attr("RO")], &opts);
        let lane = &tree.children()[0];
        let rails = lane.children()[0].children();
        assert_eq!(rails[0].get_attr("x2"), Some(&AttrValue::Int(888)));
        assert_eq!(rails[2].get_attr("x1"), Some(&AttrValue::Int(0)));
        assert_eq!(
            layers(lane)[3].get_attr("transform").map(ToString::to_string),
            Some("translate(27.75, 80)".to_string())
        );
    }
}
