// src/visualisation.rs

use plotters::prelude::*;

/// Save <S_x>, <S_y>, <S_z> against time as a PNG line chart.
pub fn save_m_avg_plot(
    times: &[f64],
    mx: &[f64],
    my: &[f64],
    mz: &[f64],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (t_min, t_max) = match (times.first(), times.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        _ => return Ok(()),
    };

    // unit spins (or close to it with LSF); leave a margin around [-1, 1]
    let y_min = -1.1;
    let y_max = 1.1;

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Average spin vs time", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc("average spin component")
        .draw()?;

    for (values, colour, label) in [(mx, RED, "m_x"), (my, GREEN, "m_y"), (mz, BLUE, "m_z")] {
        chart
            .draw_series(LineSeries::new(
                times.iter().zip(values.iter()).map(|(&t, &v)| (t, v)),
                &colour,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Save lattice and spin temperature traces (K) against time.
pub fn save_temperature_plot(
    times: &[f64],
    lattice: &[f64],
    spin: &[f64],
    bath: f64,
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (t_min, t_max) = match (times.first(), times.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        _ => return Ok(()),
    };

    let finite_max = lattice
        .iter()
        .chain(spin.iter())
        .copied()
        .filter(|v| v.is_finite())
        .fold(bath, f64::max);
    let y_max = if finite_max > 0.0 { 1.2 * finite_max } else { 1.0 };

    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Temperatures vs time", ("sans-serif", 30))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("time (s)")
        .y_desc("temperature (K)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            times.iter().zip(lattice.iter()).map(|(&t, &v)| (t, v)),
            &RED,
        ))?
        .label("T_lattice")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(LineSeries::new(
            times
                .iter()
                .zip(spin.iter())
                .filter(|(_, v)| v.is_finite())
                .map(|(&t, &v)| (t, v)),
            &BLUE,
        ))?
        .label("T_spin")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(vec![(t_min, bath), (t_max, bath)], &BLACK))?
        .label("bath")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}
