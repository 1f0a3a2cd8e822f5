use std::io::{self, Write};

use serde_json::{Value, json};

use crate::record::local_time;
use crate::report::{Axis, Panel, SeriesChart};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

// Vertical layout of the three stacked panels, as fractions of the page.
const SPEED_DOMAIN: [f64; 2] = [0.68, 1.0];
const LOSS_DOMAIN: [f64; 2] = [0.36, 0.6];
const TABLE_DOMAIN: [f64; 2] = [0.0, 0.28];

fn date_string(timestamp: f64) -> String {
    local_time(timestamp)
        .format("%Y-%m-%d %H:%M:%S%.6f")
        .to_string()
}

fn axis_ids(panel_index: usize) -> (&'static str, &'static str, &'static str) {
    match panel_index {
        0 => ("x", "y", "y2"),
        _ => ("x2", "y3", "y3"),
    }
}

fn panel_traces(panel: &Panel, panel_index: usize) -> Vec<Value> {
    let (x, y, y_secondary) = axis_ids(panel_index);
    panel
        .series
        .iter()
        .map(|series| {
            let xs: Vec<String> = series.points.iter().map(|&(t, _)| date_string(t)).collect();
            let ys: Vec<f64> = series.points.iter().map(|&(_, v)| v).collect();
            let yaxis = if series.axis == Axis::Secondary { y_secondary } else { y };
            json!({
                "type": "scatter",
                "mode": "lines+markers",
                "name": series.name,
                "x": xs,
                "y": ys,
                "xaxis": x,
                "yaxis": yaxis,
            })
        })
        .collect()
}

fn reference_shapes(
    panel: &Panel,
    panel_index: usize,
    shapes: &mut Vec<Value>,
    annotations: &mut Vec<Value>,
) {
    let (x, y, y_secondary) = axis_ids(panel_index);
    for line in &panel.reference_lines {
        let yref = if line.axis == Axis::Secondary { y_secondary } else { y };
        shapes.push(json!({
            "type": "line",
            "xref": format!("{x} domain"),
            "x0": 0,
            "x1": 1,
            "yref": yref,
            "y0": line.value,
            "y1": line.value,
            "line": { "dash": "dash" },
        }));
        if let Some(label) = &line.label {
            // the loss panel labels its line on the right, the speed panel on the left
            let (label_x, anchor) = if panel_index > 0 { (1, "right") } else { (0, "left") };
            annotations.push(json!({
                "text": label,
                "showarrow": false,
                "xref": format!("{x} domain"),
                "x": label_x,
                "xanchor": anchor,
                "yref": yref,
                "y": line.value,
                "yanchor": "bottom",
            }));
        }
    }
}

fn gap_shapes(chart: &SeriesChart, shapes: &mut Vec<Value>) {
    for &gap in &chart.gaps {
        for panel_index in 0..2 {
            let (x, y, _) = axis_ids(panel_index);
            shapes.push(json!({
                "type": "line",
                "xref": x,
                "x0": date_string(gap),
                "x1": date_string(gap),
                "yref": format!("{y} domain"),
                "y0": 0,
                "y1": 1,
                "line": { "dash": "dot", "color": "red" },
            }));
        }
    }
}

fn trace_table(chart: &SeriesChart) -> Value {
    let header: Vec<String> = chart.traces.iter().map(|c| date_string(c.timestamp)).collect();
    let cells: Vec<&Vec<String>> = chart.traces.iter().map(|c| &c.hops).collect();
    json!({
        "type": "table",
        "domain": { "x": [0, 1], "y": TABLE_DOMAIN },
        "header": { "values": header, "font": { "size": 10 }, "align": "left" },
        "cells": { "values": cells, "align": "left" },
    })
}

pub fn plotly_figure(chart: &SeriesChart) -> Value {
    let mut data = Vec::new();
    let mut shapes = Vec::new();
    let mut annotations = Vec::new();

    for (index, panel) in chart.panels().into_iter().enumerate() {
        data.extend(panel_traces(panel, index));
        reference_shapes(panel, index, &mut shapes, &mut annotations);
    }
    gap_shapes(chart, &mut shapes);
    data.push(trace_table(chart));

    let layout = json!({
        "title": { "text": chart.title },
        "xaxis": { "anchor": "y", "matches": "x2", "showticklabels": false },
        "xaxis2": { "anchor": "y3", "title": { "text": chart.x_title } },
        "yaxis": {
            "domain": SPEED_DOMAIN,
            "title": { "text": chart.speed.y_title },
            "rangemode": "tozero",
        },
        "yaxis2": {
            "overlaying": "y",
            "side": "right",
            "title": { "text": chart.speed.secondary_y_title },
            "rangemode": "tozero",
        },
        "yaxis3": {
            "domain": LOSS_DOMAIN,
            "title": { "text": chart.packet_loss.y_title },
            "rangemode": "tozero",
        },
        "shapes": shapes,
        "annotations": annotations,
    });

    json!({ "data": data, "layout": layout })
}

/// Writes a standalone page that draws the chart with plotly loaded from its CDN.
pub fn write_html<W: Write>(chart: &SeriesChart, out: &mut W) -> io::Result<()> {
    let figure = serde_json::to_string(&plotly_figure(chart))?.replace("</", "<\\/");
    write!(
        out,
        r#"<html>
<head><meta charset="utf-8" /><title>{title}</title></head>
<body>
<div id="chart" style="height:100vh; width:100%;"></div>
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout);
</script>
</body>
</html>
"#,
        title = chart.title,
    )
}
