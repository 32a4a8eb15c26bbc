use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use time::Date;

use super::combine::load_combined;
use super::config::{Metric, PlotConfig};
use super::constants::{DSAR_COLUMN_PREFIX, FIGURES_DIRECTORY};
use super::dsar::Dsar;
use super::error::{CombineError, PlotError};
use super::interval::{
    date_to_nanos, floor_to_day, from_nanos, Interval, NANOS_PER_DAY, NANOS_PER_SECOND,
};
use super::nslc::Nslc;
use super::smoothing::{hp_filter, rolling_median};
use super::table::Table;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PANEL_HEIGHT: u32 = 400;
const FIGURE_WIDTH: u32 = 1200;
const DEFAULT_RSAM_Y_RANGE: (f64, f64) = (0.0, 0.002);
const SECONDS_PER_DAY: i64 = NANOS_PER_DAY / NANOS_PER_SECOND;

// The x axis is in whole seconds since the epoch
fn nanos_to_seconds(nanos: i64) -> i64 {
    nanos.div_euclid(NANOS_PER_SECOND)
}

fn date_to_seconds(date: Date) -> i64 {
    nanos_to_seconds(date_to_nanos(date))
}

fn day_label(seconds: i64) -> String {
    from_nanos(seconds * NANOS_PER_SECOND).date().to_string()
}

/// Midnights between `start` and `end` (seconds, inclusive), `interval_day` days apart
fn day_ticks(start: i64, end: i64, interval_day: u32) -> Vec<i64> {
    let step = SECONDS_PER_DAY * interval_day.max(1) as i64;
    let mut tick = nanos_to_seconds(floor_to_day(start * NANOS_PER_SECOND));
    if tick < start {
        tick += SECONDS_PER_DAY;
    }
    let mut ticks = vec![];
    while tick <= end {
        ticks.push(tick);
        tick += step;
    }
    ticks
}

/// One chart of a figure: a scatter of the raw values with smoothed lines on top
struct Panel {
    title: String,
    times: Vec<i64>,
    scatter_label: String,
    scatter: Vec<f64>,
    lines: Vec<(String, Vec<f64>, RGBColor)>,
}

impl Panel {
    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.scatter
            .iter()
            .chain(self.lines.iter().flat_map(|(_, v, _)| v.iter()))
            .copied()
            .filter(|v| v.is_finite())
    }
}

/// `{output}/figures/{metric}/{NSLC or "stations"}/{name}_{resample}_{start}-{end}.svg`
pub fn figure_path(
    output: &Path,
    metric: Metric,
    nslcs: &[Nslc],
    resample: Interval,
    start: Date,
    end: Date,
) -> PathBuf {
    let name = match nslcs {
        [single] => single.to_string(),
        _ => String::from("stations"),
    };
    output
        .join(FIGURES_DIRECTORY)
        .join(metric.to_string())
        .join(&name)
        .join(format!("{name}_{resample}_{start}-{end}.svg"))
}

fn dsar_panel(
    nslc: &Nslc,
    table: &Table,
    resample: Interval,
    config: &PlotConfig,
) -> Result<Panel, PlotError> {
    let ratio_column = format!("{DSAR_COLUMN_PREFIX}_{resample}");
    let scatter = table
        .column_values(&ratio_column)
        .ok_or_else(|| PlotError::MissingColumn {
            station: nslc.to_string(),
            column: ratio_column.clone(),
        })?;
    let times_ns: Vec<i64> = table.timestamps().collect();
    let daily_column = Dsar::window_column(Interval::hours(24));
    let daily = table
        .column_values(&daily_column)
        .unwrap_or_else(|| rolling_median(&times_ns, &scatter, Interval::hours(24)));

    let mut lines = vec![(daily_column, daily, ORANGE)];
    if let Some(lambda) = config.hp_lambda {
        lines.push((String::from("HP trend"), hp_filter(&scatter, lambda), RED));
    }
    Ok(Panel {
        title: config
            .title
            .clone()
            .unwrap_or_else(|| format!("DSAR - {nslc}")),
        times: times_ns.iter().map(|t| nanos_to_seconds(*t)).collect(),
        scatter_label: ratio_column,
        scatter,
        lines,
    })
}

fn rsam_panel(nslc: &Nslc, table: &Table, config: &PlotConfig) -> Result<Panel, PlotError> {
    let column = &config.rsam_column;
    let scatter = table
        .column_values(column)
        .ok_or_else(|| PlotError::MissingColumn {
            station: nslc.to_string(),
            column: column.clone(),
        })?;
    let times_ns: Vec<i64> = table.timestamps().collect();
    let daily = rolling_median(&times_ns, &scatter, Interval::hours(24));
    Ok(Panel {
        title: config
            .title
            .clone()
            .unwrap_or_else(|| format!("RSAM {column} - {nslc}")),
        times: times_ns.iter().map(|t| nanos_to_seconds(*t)).collect(),
        scatter_label: column.clone(),
        scatter,
        lines: vec![(format!("{column} 24h median"), daily, RED)],
    })
}

fn y_range(metric: Metric, panel: &Panel, config: &PlotConfig) -> Range<f64> {
    let (auto_min, auto_max) = match metric {
        Metric::Rsam => DEFAULT_RSAM_Y_RANGE,
        Metric::Dsar => {
            let (lo, hi) = panel
                .values()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if !lo.is_finite() {
                (0.0, 1.0)
            } else if hi <= lo {
                (lo - 0.5, lo + 0.5)
            } else {
                let pad = 0.05 * (hi - lo);
                (lo - pad, hi + pad)
            }
        }
    };
    config.y_min.unwrap_or(auto_min)..config.y_max.unwrap_or(auto_max)
}

fn draw_panel(
    area: &DrawingArea<SVGBackend, Shift>,
    panel: &Panel,
    x_range: Range<i64>,
    y_range: Range<f64>,
    config: &PlotConfig,
) -> Result<(), PlotError> {
    let ticks = day_ticks(x_range.start, x_range.end, config.interval_day);
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.with_key_points(ticks), y_range.clone())?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| day_label(*x))
        .y_desc(&panel.scatter_label)
        .draw()?;

    for eruption in config.continuous_eruptions.iter() {
        chart.draw_series(std::iter::once(Rectangle::new(
            [
                (date_to_seconds(eruption.start), y_range.start),
                (date_to_seconds(eruption.end), y_range.end),
            ],
            ORANGE.mix(0.4).filled(),
        )))?;
    }
    for date in config.single_eruptions.iter() {
        let x = date_to_seconds(*date);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y_range.start), (x, y_range.end)],
            RED,
        )))?;
    }

    chart
        .draw_series(
            panel
                .times
                .iter()
                .zip(panel.scatter.iter())
                .filter(|(_, y)| y.is_finite())
                .map(|(x, y)| Circle::new((*x, *y), 2, BLACK.mix(0.3).filled())),
        )?
        .label(&panel.scatter_label)
        .legend(|(x, y)| Circle::new((x + 10, y), 2, BLACK.mix(0.3).filled()));

    for (label, values, color) in panel.lines.iter() {
        let color = *color;
        chart
            .draw_series(LineSeries::new(
                panel
                    .times
                    .iter()
                    .zip(values.iter())
                    .filter(|(_, y)| y.is_finite())
                    .map(|(x, y)| (*x, *y)),
                color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Draw one panel per station from their combined tables and write the figure as SVG.
///
/// Returns the path of the written figure.
pub fn plot_tables(
    output: &Path,
    metric: Metric,
    stations: &[(Nslc, Table)],
    resample: Interval,
    config: &PlotConfig,
) -> Result<PathBuf, PlotError> {
    let mut panels = Vec::with_capacity(stations.len());
    let mut first = i64::MAX;
    let mut last = i64::MIN;
    for (nslc, table) in stations.iter() {
        let (start, end) = match (table.first_timestamp(), table.last_timestamp()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(PlotError::EmptyTable(nslc.to_string())),
        };
        first = first.min(start);
        last = last.max(end);
        panels.push(match metric {
            Metric::Dsar => dsar_panel(nslc, table, resample, config)?,
            Metric::Rsam => rsam_panel(nslc, table, config)?,
        });
    }
    if panels.is_empty() {
        return Err(PlotError::EmptyTable(String::from("no stations")));
    }

    let nslcs: Vec<Nslc> = stations.iter().map(|(nslc, _)| nslc.clone()).collect();
    let path = figure_path(
        output,
        metric,
        &nslcs,
        resample,
        from_nanos(first).date(),
        from_nanos(last).date(),
    );
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut x_range = nanos_to_seconds(first)..nanos_to_seconds(last);
    if x_range.end <= x_range.start {
        x_range.end = x_range.start + SECONDS_PER_DAY;
    }

    {
        let root = SVGBackend::new(&path, (FIGURE_WIDTH, PANEL_HEIGHT * panels.len() as u32))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((panels.len(), 1));
        for (area, panel) in areas.iter().zip(panels.iter()) {
            draw_panel(area, panel, x_range.clone(), y_range(metric, panel, config), config)?;
        }
        root.present()?;
    }
    log::info!("Figure saved to {}", path.display());
    Ok(path)
}

/// Load the combined tables of the stations. Stations without a combined file or with an empty
/// one are logged and left out.
pub fn load_tables(
    output: &Path,
    metric: Metric,
    nslcs: &[Nslc],
    resample: Interval,
) -> Result<Vec<(Nslc, Table)>, PlotError> {
    let mut stations = Vec::with_capacity(nslcs.len());
    for nslc in nslcs {
        match load_combined(output, metric, nslc, resample) {
            Ok(table) if table.is_empty() => {
                log::warn!("{nslc} :: Combined {metric} table is empty, skipping")
            }
            Ok(table) => stations.push((nslc.clone(), table)),
            Err(CombineError::NoFiles(path)) => {
                log::warn!("{nslc} :: No combined file at {}, skipping", path.display())
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(stations)
}

/// Load the combined tables of the stations and plot them in one figure.
///
/// Returns `None` when none of the stations has data to plot.
pub fn plot(
    output: &Path,
    metric: Metric,
    nslcs: &[Nslc],
    resample: Interval,
    config: &PlotConfig,
) -> Result<Option<PathBuf>, PlotError> {
    let stations = load_tables(output, metric, nslcs, resample)?;
    if stations.is_empty() {
        return Ok(None);
    }
    Ok(Some(plot_tables(output, metric, &stations, resample, config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContinuousEruption;
    use crate::interval::NANOS_PER_SECOND;
    use std::str::FromStr;
    use time::macros::date;

    fn dsar_table() -> Table {
        let start = date_to_nanos(date!(2025 - 01 - 01));
        let step = 600 * NANOS_PER_SECOND;
        let mut table = Table::with_columns(vec![
            "DSAR_10min".to_string(),
            "DSAR_24h_median".to_string(),
        ]);
        for i in 0..(3 * 144) {
            let v = 1.0 + (i % 7) as f64 * 0.1;
            table.push_row(start + i * step, vec![v, 1.3]);
        }
        table
    }

    #[test]
    fn test_figure_path() {
        let nslc = Nslc::from_str("VG.OJN.00.EHZ").unwrap();
        let path = figure_path(
            Path::new("out"),
            Metric::Dsar,
            &[nslc.clone()],
            Interval::minutes(10),
            date!(2025 - 01 - 01),
            date!(2025 - 01 - 03),
        );
        assert_eq!(
            path,
            PathBuf::from("out/figures/dsar/VG.OJN.00.EHZ/VG.OJN.00.EHZ_10min_2025-01-01-2025-01-03.svg")
        );
        let other = Nslc::from_str("VG.LEKR.00.EHZ").unwrap();
        let path = figure_path(
            Path::new("out"),
            Metric::Rsam,
            &[nslc, other],
            Interval::minutes(10),
            date!(2025 - 01 - 01),
            date!(2025 - 01 - 03),
        );
        assert!(path.starts_with("out/figures/rsam/stations"));
    }

    #[test]
    fn test_plot_dsar_svg() {
        let dir = tempfile::tempdir().unwrap();
        let nslc = Nslc::from_str("VG.OJN.00.EHZ").unwrap();
        let config = PlotConfig {
            hp_lambda: Some(1600.0),
            continuous_eruptions: vec![ContinuousEruption {
                start: date!(2025 - 01 - 02),
                end: date!(2025 - 01 - 02),
            }],
            single_eruptions: vec![date!(2025 - 01 - 03)],
            ..Default::default()
        };
        let path = plot_tables(
            dir.path(),
            Metric::Dsar,
            &[(nslc, dsar_table())],
            Interval::minutes(10),
            &config,
        )
        .unwrap();
        assert!(path.ends_with("VG.OJN.00.EHZ_10min_2025-01-01-2025-01-03.svg"));
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_day_ticks() {
        let start = date_to_seconds(date!(2025 - 01 - 01));
        let end = date_to_seconds(date!(2025 - 01 - 30));
        let labels: Vec<String> = day_ticks(start, end, 3).into_iter().map(day_label).collect();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels[0], "2025-01-01");
        assert_eq!(labels[1], "2025-01-04");
        assert_eq!(labels[9], "2025-01-28");

        // First tick is the next midnight when the range starts mid-day
        let ticks = day_ticks(start + 3600, start + 2 * SECONDS_PER_DAY, 1);
        assert_eq!(ticks, vec![start + SECONDS_PER_DAY, start + 2 * SECONDS_PER_DAY]);
    }

    #[test]
    fn test_rsam_title_override() {
        let nslc = Nslc::from_str("VG.OJN.00.EHZ").unwrap();
        let mut table = Table::with_columns(vec!["VT".to_string()]);
        table.push_row(date_to_nanos(date!(2025 - 01 - 01)), vec![0.001]);
        let mut config = PlotConfig::default();
        assert_eq!(rsam_panel(&nslc, &table, &config).unwrap().title, "RSAM VT - VG.OJN.00.EHZ");
        config.title = Some(String::from("Lewotobi"));
        assert_eq!(rsam_panel(&nslc, &table, &config).unwrap().title, "Lewotobi");
    }

    #[test]
    fn test_plot_skips_stations_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let resample = Interval::minutes(10);
        let missing = Nslc::from_str("VG.LEKR.00.EHZ").unwrap();
        let present = Nslc::from_str("VG.OJN.00.EHZ").unwrap();
        let path = crate::combine::combined_path(dir.path(), Metric::Dsar, &present, resample);
        crate::csv_table::write_table(&dsar_table(), &path).unwrap();

        let config = PlotConfig::default();
        let figure = plot(
            dir.path(),
            Metric::Dsar,
            &[missing.clone(), present.clone()],
            resample,
            &config,
        )
        .unwrap()
        .unwrap();
        assert!(figure.exists());
        assert!(plot(dir.path(), Metric::Dsar, &[missing], resample, &config)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_plot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let nslc = Nslc::from_str("VG.OJN.00.EHZ").unwrap();
        let config = PlotConfig::default();
        assert!(matches!(
            plot_tables(
                dir.path(),
                Metric::Rsam,
                &[(nslc.clone(), Table::new())],
                Interval::minutes(10),
                &config
            ),
            Err(PlotError::EmptyTable(_))
        ));
        assert!(matches!(
            plot_tables(
                dir.path(),
                Metric::Rsam,
                &[(nslc, dsar_table())],
                Interval::minutes(10),
                &config
            ),
            Err(PlotError::MissingColumn { .. })
        ));
    }
}
