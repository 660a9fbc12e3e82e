//! SVG rendering of chart specs for the printed report.

use biogeography_bap_models::chart::{ChartData, ChartDatum, ChartKind, ChartSpec};
use biogeography_bap_models::print::{PrintNode, SvgBlock, TextBlock};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::AnalysisError;

/// Pixel size of a rendered chart.
pub const CHART_SIZE: (u32, u32) = (640, 400);

/// Width of a chart image in the print document, in points.
const PRINT_WIDTH: f64 = 500.0;

const DEFAULT_COLOR: RGBColor = RGBColor(70, 130, 180);

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

fn draw_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Draw {
        message: e.to_string(),
    }
}

/// Renders one chart to an SVG document.
///
/// # Errors
///
/// Returns [`AnalysisError::Draw`] if the drawing backend fails.
pub fn render(spec: &ChartSpec) -> Result<String, AnalysisError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;
        match spec.kind {
            ChartKind::HorizontalBar => horizontal_bars(&root, spec)?,
            ChartKind::VerticalBar => vertical_bars(&root, spec)?,
            ChartKind::Line => line(&root, spec)?,
        }
        root.present().map_err(draw_error)?;
    }
    Ok(svg)
}

/// Print nodes for every chart: the subtitle, when present, followed by
/// the chart image. Charts that fail to render are skipped.
#[must_use]
pub fn chart_nodes(charts: &ChartData) -> Vec<PrintNode> {
    let mut nodes = Vec::new();
    for spec in charts.charts() {
        let svg = match render(spec) {
            Ok(svg) => svg,
            Err(e) => {
                log::warn!("Skipping chart {} in print: {e}", spec.id);
                continue;
            }
        };
        if !spec.config.chart.subtitle.is_empty() {
            nodes.push(
                TextBlock::new(spec.config.chart.subtitle.clone())
                    .style("chartSubtitle")
                    .margin([0.0, 10.0, 0.0, 5.0])
                    .into(),
            );
        }
        nodes.push(
            SvgBlock {
                svg,
                width: PRINT_WIDTH,
                margin: Some([0.0, 5.0, 0.0, 10.0]),
            }
            .into(),
        );
    }
    nodes
}

#[allow(clippy::cast_possible_truncation)]
fn px(value: f64) -> i32 {
    value.round() as i32
}

#[allow(clippy::cast_precision_loss)]
fn slot_range(data: &[ChartDatum]) -> std::ops::Range<f64> {
    -0.5..(data.len() as f64 - 0.5)
}

/// Value span of a bar chart, always including zero.
fn bar_span(data: &[ChartDatum]) -> std::ops::Range<f64> {
    let low = data.iter().map(|d| d.value).fold(0.0_f64, f64::min);
    let high = data.iter().map(|d| d.value).fold(0.0_f64, f64::max);
    if high - low <= f64::EPSILON {
        return 0.0..1.0;
    }
    (low * 1.1)..(high * 1.1)
}

/// Value span of a line chart with some padding.
fn line_span(data: &[ChartDatum]) -> std::ops::Range<f64> {
    let low = data.iter().map(|d| d.value).fold(f64::INFINITY, f64::min);
    let high = data.iter().map(|d| d.value).fold(f64::NEG_INFINITY, f64::max);
    if !low.is_finite() || !high.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((high - low) * 0.05).max(1.0);
    (low - pad)..(high + pad)
}

/// Category label for a slot coordinate; blank between slots.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn label_at(data: &[ChartDatum], coord: f64) -> String {
    let slot = coord.round();
    if slot < 0.0 || (coord - slot).abs() > 0.01 {
        return String::new();
    }
    data.get(slot as usize)
        .map(|d| d.label.clone())
        .unwrap_or_default()
}

fn color(datum: &ChartDatum) -> RGBColor {
    datum
        .color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or(DEFAULT_COLOR)
}

fn parse_hex(hex: &str) -> Option<RGBColor> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

#[allow(clippy::cast_precision_loss)]
fn horizontal_bars(root: &Area<'_>, spec: &ChartSpec) -> Result<(), AnalysisError> {
    let margins = spec.config.margins;
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.config.chart.title, ("sans-serif", 16).into_font())
        .margin_top(px(margins.top))
        .margin_right(px(margins.right))
        .x_label_area_size(px(margins.bottom))
        .y_label_area_size(px(margins.left))
        .build_cartesian_2d(bar_span(&spec.data), slot_range(&spec.data))
        .map_err(draw_error)?;

    let x_axis = &spec.config.x_axis;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_labels(x_axis.ticks as usize)
        .x_label_formatter(&|v: &f64| x_axis.tick_format.format(*v))
        .y_labels(spec.data.len())
        .y_label_formatter(&|v: &f64| label_at(&spec.data, *v))
        .x_desc(x_axis.label.as_str())
        .y_desc(spec.config.y_axis.label.as_str())
        .draw()
        .map_err(draw_error)?;

    chart
        .draw_series(spec.data.iter().enumerate().map(|(i, d)| {
            let slot = i as f64;
            Rectangle::new([(0.0, slot - 0.35), (d.value, slot + 0.35)], color(d).filled())
        }))
        .map_err(draw_error)?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn vertical_bars(root: &Area<'_>, spec: &ChartSpec) -> Result<(), AnalysisError> {
    let margins = spec.config.margins;
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.config.chart.title, ("sans-serif", 16).into_font())
        .margin_top(px(margins.top))
        .margin_right(px(margins.right))
        .x_label_area_size(px(margins.bottom))
        .y_label_area_size(px(margins.left))
        .build_cartesian_2d(slot_range(&spec.data), bar_span(&spec.data))
        .map_err(draw_error)?;

    let y_axis = &spec.config.y_axis;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(spec.data.len())
        .x_label_formatter(&|v: &f64| label_at(&spec.data, *v))
        .y_labels(y_axis.ticks as usize)
        .y_label_formatter(&|v: &f64| y_axis.tick_format.format(*v))
        .x_desc(spec.config.x_axis.label.as_str())
        .y_desc(y_axis.label.as_str())
        .draw()
        .map_err(draw_error)?;

    chart
        .draw_series(spec.data.iter().enumerate().map(|(i, d)| {
            let slot = i as f64;
            Rectangle::new([(slot - 0.35, 0.0), (slot + 0.35, d.value)], color(d).filled())
        }))
        .map_err(draw_error)?;
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn line(root: &Area<'_>, spec: &ChartSpec) -> Result<(), AnalysisError> {
    let margins = spec.config.margins;
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.config.chart.title, ("sans-serif", 16).into_font())
        .margin_top(px(margins.top))
        .margin_right(px(margins.right))
        .x_label_area_size(px(margins.bottom))
        .y_label_area_size(px(margins.left))
        .build_cartesian_2d(slot_range(&spec.data), line_span(&spec.data))
        .map_err(draw_error)?;

    let x_axis = &spec.config.x_axis;
    let y_axis = &spec.config.y_axis;
    chart
        .configure_mesh()
        .x_labels(x_axis.ticks as usize)
        .x_label_formatter(&|v: &f64| label_at(&spec.data, *v))
        .y_labels(y_axis.ticks as usize)
        .y_label_formatter(&|v: &f64| y_axis.tick_format.format(*v))
        .x_desc(x_axis.label.as_str())
        .y_desc(y_axis.label.as_str())
        .draw()
        .map_err(draw_error)?;

    let stroke = spec.data.first().map_or(DEFAULT_COLOR, color);
    let points: Vec<(f64, f64)> = spec
        .data
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.value))
        .collect();
    chart
        .draw_series(LineSeries::new(points.iter().copied(), stroke.stroke_width(2)))
        .map_err(draw_error)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, stroke.filled())),
        )
        .map_err(draw_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use biogeography_bap_models::chart::{
        Axis, ChartConfig, ChartTitle, Margins, TickFormat, Tooltip,
    };

    use super::*;

    fn spec(kind: ChartKind) -> ChartSpec {
        let axis = |label: &str| Axis {
            key: label.to_string(),
            label: label.to_string(),
            ticks: 5,
            tick_format: TickFormat::Identity,
        };
        ChartSpec {
            id: "Test_Chart".to_string(),
            kind,
            config: ChartConfig {
                margins: Margins {
                    left: 100.0,
                    right: 20.0,
                    top: 20.0,
                    bottom: 70.0,
                },
                chart: ChartTitle {
                    title: "Habitat".to_string(),
                    subtitle: "Scored within Larimer County".to_string(),
                },
                x_axis: axis("Percent"),
                y_axis: axis("Risk"),
                tooltip: Tooltip::new("{label}"),
            },
            data: vec![
                ChartDatum {
                    label: "Low".to_string(),
                    value: 40.0,
                    color: Some("#00C5FF".to_string()),
                },
                ChartDatum {
                    label: "High".to_string(),
                    value: 60.0,
                    color: None,
                },
            ],
        }
    }

    #[test]
    fn renders_every_chart_kind() {
        for kind in [ChartKind::HorizontalBar, ChartKind::VerticalBar, ChartKind::Line] {
            let svg = render(&spec(kind)).unwrap();
            assert!(svg.contains("<svg"), "{kind:?} did not produce an svg");
            assert!(svg.contains("Habitat"), "{kind:?} is missing its title");
        }
    }

    #[test]
    fn chart_nodes_include_subtitle_then_image() {
        let nodes = chart_nodes(&ChartData::Ready(vec![spec(ChartKind::HorizontalBar)]));
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], PrintNode::Text(t) if t.plain_text().contains("Larimer")));
        assert!(matches!(&nodes[1], PrintNode::Svg(_)));
        assert!(chart_nodes(&ChartData::NoData).is_empty());
    }

    #[test]
    fn labels_only_at_slot_centres() {
        let data = spec(ChartKind::VerticalBar).data;
        assert_eq!(label_at(&data, 0.0), "Low");
        assert_eq!(label_at(&data, 1.0), "High");
        assert_eq!(label_at(&data, 0.5), "");
        assert_eq!(label_at(&data, -1.0), "");
        assert_eq!(label_at(&data, 2.0), "");
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex("#FFAA00"), Some(RGBColor(255, 170, 0)));
        assert_eq!(parse_hex("FFAA00"), None);
        assert_eq!(parse_hex("#FFF"), None);
    }
}
