//! # Control Cycle Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::tc::Command;
use sim_lib::{
    act_model,
    cycle::proc_cycle,
    data_store::DataStore,
    pid_ctrl::{AxisParams, GainSchedule, Params, PidCtrl},
    tc_processor,
};

fn cycle_benchmark(c: &mut Criterion) {
    // ---- Build a data store with typical gains ----

    let mut ds = DataStore::new(0.02);

    ds.pid_ctrl = PidCtrl::new(Params {
        pixel_scale: 0.01,
        rotation: AxisParams {
            k_p: 0.8,
            k_i: 0.05,
            k_d: 0.1,
            dead_band_min_px: -15.0,
            dead_band_max_px: 15.0,
            output_limit: 2.0,
            ..Default::default()
        },
        movement: AxisParams {
            k_p: 1.2,
            k_i: 0.02,
            k_d: 0.05,
            setpoint_px: 40.0,
            dead_band_min_px: 35.0,
            dead_band_max_px: 45.0,
            output_limit: 1.5,
            max_rate: Some(2.0),
            gain_schedule: Some(GainSchedule {
                threshold: 0.3,
                fine_kp_factor: 0.4,
                fine_output_limit: 0.5,
            }),
            ..Default::default()
        },
    });
    ds.act_model = act_model::ActModel::new(act_model::Params::default());

    let cmds = [
        Command::parse("left#60|distance#120").unwrap(),
        Command::parse("right#10|distance#50").unwrap(),
        Command::parse("none|none").unwrap(),
    ];

    // ---- Benchmark one cycle ----

    let mut i = 0usize;
    c.bench_function("control cycle", |b| b.iter(|| {
        ds.cycle_start();
        tc_processor::exec(&mut ds, &cmds[i % cmds.len()]);
        proc_cycle(&mut ds);
        ds.cycle_end();
        i += 1;
    }));
}

criterion_group!(benches, cycle_benchmark);
criterion_main!(benches);
