use svp_raytrace::{
    build_model, trace, PathPoint, PathRecorder, RayRequest, RayStatus, RaytraceError,
    RecordMode, SsvMode, VelocityModel,
};

fn request(depth: f64, angle: f64, time: f64) -> RayRequest {
    RayRequest {
        source_depth: depth,
        launch_angle_deg: angle,
        max_time: time,
        ..Default::default()
    }
}

fn recorded(model: &VelocityModel, req: &RayRequest, mode: RecordMode) -> Vec<PathPoint> {
    let mut recorder = PathRecorder::new(1024, mode);
    trace(model, req, Some(&mut recorder)).unwrap();
    recorder.into_points()
}

/// Ray parameter of the circle through two points of a gradient layer whose
/// centre lies at `center_depth`.
fn arc_slowness(a: PathPoint, b: PathPoint, center_depth: f64, gradient: f64) -> f64 {
    let dx = b.offset - a.offset;
    let da = a.depth - center_depth;
    let db = b.depth - center_depth;
    // Horizontal distance from `a` to the circle centre
    let xc = (dx * dx + (db - da) * (db + da)) / (2.0 * dx);
    let radius = (xc * xc + da * da).sqrt();
    1.0 / (radius * gradient.abs())
}

#[test]
fn test_vertical_ray_has_zero_offset() {
    let model = build_model(&[(0.0, 1500.0), (80.0, 1500.0), (200.0, 1540.0), (600.0, 1490.0)])
        .unwrap();
    for (depth, angle) in [(0.0, 0.0), (150.0, 0.0), (600.0, 180.0), (300.0, -180.0)] {
        for time in [0.01, 0.05, 0.2, 1.0] {
            let req = request(depth, angle, time);
            let result = model.trace(&req).unwrap();
            assert_eq!(result.offset, 0.0);
            for point in recorded(&model, &req, RecordMode::Full) {
                assert_eq!(point.offset, 0.0);
            }
        }
    }
}

#[test]
fn test_homogeneous_layer_is_straight() {
    let model = build_model(&[(0.0, 1500.0), (1000.0, 1500.0)]).unwrap();
    let result = model.trace(&request(0.0, 30.0, 0.2)).unwrap();
    assert!((result.offset - 150.0).abs() < 1e-9);
    assert!((result.depth - 1500.0 * 30.0_f64.to_radians().cos() * 0.2).abs() < 1e-9);
    assert!((result.depth - 259.8076).abs() < 1e-4);
    assert_eq!(result.elapsed_time, 0.2);
    assert_eq!(result.status, RayStatus::Down);

    let result = model.trace(&request(400.0, -45.0, 0.1)).unwrap();
    let leg = 150.0 * 45.0_f64.to_radians().sin();
    assert!((result.offset + leg).abs() < 1e-9);
    assert!((result.depth - 400.0 - leg).abs() < 1e-9);
}

#[test]
fn test_turning_arc_is_symmetric() {
    // Homogeneous layer above a gradient layer of 1 (m/s)/m; the source sits
    // on their shared boundary.
    let model = build_model(&[(0.0, 1500.0), (100.0, 1500.0), (200.0, 1600.0)]).unwrap();
    let angle = 80.0_f64;
    let sine = angle.to_radians().sin();
    let time_to_turn = (1.0 / sine).acosh();

    let at_turn = model.trace(&request(100.0, angle, time_to_turn)).unwrap();
    let turning_depth = 100.0 + (1500.0 / sine - 1500.0);
    assert!((at_turn.depth - turning_depth).abs() < 1e-6);
    assert!((at_turn.depth - 123.1399).abs() < 1e-3);
    assert!((at_turn.offset - 1500.0 / angle.to_radians().tan()).abs() < 1e-3);

    let back = model.trace(&request(100.0, angle, 2.0 * time_to_turn)).unwrap();
    assert!((back.offset - 2.0 * at_turn.offset).abs() < 1e-3);
    assert!((back.depth - 100.0).abs() < 1e-9);
    assert!((back.elapsed_time - 2.0 * time_to_turn).abs() < 1e-12);
    assert_eq!(back.status, RayStatus::UpTurn);
}

#[test]
fn test_turned_ray_continues_upward() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1500.0), (200.0, 1600.0)]).unwrap();
    let result = model.trace(&request(100.0, 80.0, 5.0)).unwrap();
    assert_eq!(result.status, RayStatus::OutTop);
    assert_eq!(result.depth, 0.0);
    assert!(result.elapsed_time < 5.0);

    // Straight climb through the top layer at the launch angle
    let symmetric = 2.0 * 1500.0 / 80.0_f64.to_radians().tan();
    let climb = 100.0 * 80.0_f64.to_radians().tan();
    assert!((result.offset - symmetric - climb).abs() < 1e-3);
}

#[test]
fn test_trace_is_idempotent() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1520.0), (500.0, 1480.0)]).unwrap();
    let req = RayRequest {
        source_depth: 12.5,
        launch_angle_deg: -47.0,
        max_time: 0.37,
        ..Default::default()
    };
    let first = model.trace(&req).unwrap();
    let second = model.trace(&req).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.offset.to_bits(), second.offset.to_bits());
    assert_eq!(first.depth.to_bits(), second.depth.to_bits());

    assert_eq!(
        recorded(&model, &req, RecordMode::Full),
        recorded(&model, &req, RecordMode::Full)
    );
}

#[test]
fn test_source_on_boundary_uses_deeper_layer() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1520.0), (500.0, 1480.0)]).unwrap();
    assert_eq!(model.layer_index_containing(100.0), Some(1));

    for depth in [0.0, 100.0, 500.0] {
        assert!(model.trace(&request(depth, 25.0, 0.01)).is_ok());
    }

    // On the model bottom heading down: leaves at once
    let result = model.trace(&request(500.0, 10.0, 1.0)).unwrap();
    assert_eq!(result.status, RayStatus::OutBottom);
    assert_eq!(result.depth, 500.0);
    assert!(result.offset.abs() < 1e-9);
    assert!(result.elapsed_time.abs() < 1e-12);

    assert!(matches!(
        model.trace(&request(-0.5, 25.0, 0.01)),
        Err(RaytraceError::SourceDepthOutOfRange { .. })
    ));
}

#[test]
fn test_end_to_end_out_bottom() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1520.0), (500.0, 1480.0)]).unwrap();
    let result = model.trace(&request(0.0, 20.0, 10.0)).unwrap();
    assert_eq!(result.status, RayStatus::OutBottom);
    assert_eq!(result.depth, 500.0);

    // Per layer: dx = (cos a1 - cos a2) / (p g),
    // dt = ln((v2 / v1) (1 + cos a1) / (1 + cos a2)) / g
    let p = 20.0_f64.to_radians().sin() / 1500.0;
    let cosine = |v: f64| (1.0 - (p * v).powi(2)).sqrt();
    let layers = [(1500.0, 1520.0, 0.2), (1520.0, 1480.0, -0.1)];
    let (mut offset, mut time) = (0.0, 0.0);
    for (v1, v2, g) in layers {
        offset += (cosine(v1) - cosine(v2)) / (p * g);
        time += ((v2 / v1) * (1.0 + cosine(v1)) / (1.0 + cosine(v2))).ln() / g;
    }

    assert!((result.offset - offset).abs() < 1e-6);
    assert!((result.elapsed_time - time).abs() < 1e-9);
    assert!((result.offset - 182.2623).abs() < 1e-3);
    assert!((result.elapsed_time - 0.354336).abs() < 1e-5);
}

#[test]
fn test_ray_parameter_is_invariant_within_a_layer() {
    let model = build_model(&[(0.0, 1500.0), (300.0, 1600.0)]).unwrap();
    let layer = model.layer(0).unwrap();
    let angle = 70.0_f64;
    let p = angle.to_radians().sin() / 1500.0;
    let source = PathPoint {
        offset: 0.0,
        depth: 0.0,
        time: 0.0,
    };

    // Before the turn, near it, and on the way back up
    for time in [0.2, 0.5, 1.0, 1.5, 2.0] {
        let result = model.trace(&request(0.0, angle, time)).unwrap();
        let end = PathPoint {
            offset: result.offset,
            depth: result.depth,
            time: result.elapsed_time,
        };
        let implied = arc_slowness(source, end, layer.depth_center, layer.gradient);
        assert!(
            ((implied - p) / p).abs() < 1e-8,
            "t = {time}: implied {implied:e} vs {p:e}"
        );

        // Elapsed time agrees with the arc-time formula for p, up to the turn
        if result.status == RayStatus::Down {
            let v = layer.velocity_at(result.depth);
            let expected = ((1.0 / (p * 1500.0)).acosh() - (1.0 / (p * v)).acosh()) / layer.gradient;
            assert!((expected - time).abs() < 1e-6);
        }
    }
}

#[test]
fn test_ray_parameter_is_invariant_across_layers() {
    let model = build_model(&[
        (0.0, 1500.0),
        (50.0, 1500.0),
        (150.0, 1530.0),
        (400.0, 1490.0),
        (600.0, 1490.0),
    ])
    .unwrap();
    let angle = 35.0_f64;
    let p = angle.to_radians().sin() / 1500.0;
    let path = recorded(&model, &request(0.0, angle, 0.45), RecordMode::Table);
    assert!(path.len() >= 4);

    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mid = 0.5 * (a.depth + b.depth);
        let layer = model.layer(model.layer_index_containing(mid).unwrap()).unwrap();
        let implied = match layer.mode {
            svp_raytrace::LayerMode::Homogeneous => {
                let (dx, dz) = (b.offset - a.offset, b.depth - a.depth);
                dx / (dx * dx + dz * dz).sqrt() / layer.velocity_top
            }
            svp_raytrace::LayerMode::Gradient => {
                arc_slowness(a, b, layer.depth_center, layer.gradient)
            }
        };
        assert!(
            ((implied - p) / p).abs() < 1e-8,
            "segment {a:?} -> {b:?}: implied {implied:e} vs {p:e}"
        );
    }
}

#[test]
fn test_full_path_stays_on_arcs() {
    let model = build_model(&[(0.0, 1500.0), (300.0, 1600.0)]).unwrap();
    let layer = model.layer(0).unwrap();
    let p = 70.0_f64.to_radians().sin() / 1500.0;
    let radius = 1.0 / (p * layer.gradient);
    let path = recorded(&model, &request(0.0, 70.0, 1.5), RecordMode::Full);
    assert_eq!(path.len(), 1 + svp_raytrace::constants::ARC_PLOT_SEGMENTS);

    // Centre offset from the source: the half chord at the source depth
    let center_offset = (radius * radius - layer.depth_center.powi(2)).sqrt();
    for point in path {
        let r = ((point.offset - center_offset).powi(2)
            + (point.depth - layer.depth_center).powi(2))
        .sqrt();
        assert!((r - radius).abs() < 1e-6);
        assert!(point.depth >= -1e-9 && point.depth < 300.0);
    }
}

#[test]
fn test_recorded_times_follow_the_ray() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1520.0), (500.0, 1480.0)]).unwrap();
    for (depth, angle, time) in [(0.0, 20.0, 10.0), (12.5, -47.0, 0.37), (300.0, 120.0, 0.3)] {
        let req = request(depth, angle, time);
        let result = model.trace(&req).unwrap();
        for mode in [RecordMode::Full, RecordMode::Table] {
            let path = recorded(&model, &req, mode);
            assert_eq!(path[0].time, 0.0);
            assert_eq!(path[path.len() - 1].time, result.elapsed_time);
            assert!(path.windows(2).all(|w| w[0].time <= w[1].time));
        }
    }

    // Inside one gradient layer every sample lies on the arc-time curve
    let model = build_model(&[(0.0, 1500.0), (300.0, 1600.0)]).unwrap();
    let layer = model.layer(0).unwrap();
    let p = 70.0_f64.to_radians().sin() / 1500.0;
    let beta = (1.0 / (p * 1500.0)).acosh();
    let path = recorded(&model, &request(0.0, 70.0, 1.5), RecordMode::Full);
    let center_offset = ((1.0 / (p * layer.gradient)).powi(2) - layer.depth_center.powi(2)).sqrt();
    for point in &path[1..] {
        let along = (1.0 / (p * layer.velocity_at(point.depth))).acosh();
        let arc_time = if point.offset < center_offset {
            beta - along
        } else {
            beta + along
        };
        let expected = arc_time / layer.gradient;
        assert!((point.time - expected).abs() < 1e-9, "{point:?} vs {expected}");
    }
}

#[test]
fn test_horizontal_ray_on_velocity_minimum_runs_out_the_budget() {
    // The source sits on the turning depth of both neighbouring layers
    let model = build_model(&[(0.0, 1520.0), (100.0, 1480.0), (200.0, 1520.0)]).unwrap();
    for angle in [90.0, -90.0] {
        let result = model.trace(&request(100.0, angle, 1.0)).unwrap();
        assert_eq!(result.depth, 100.0);
        assert_eq!(result.elapsed_time, 1.0);
        assert!((result.offset - angle.signum() * 1480.0).abs() < 1e-2);
        assert!(!result.status.is_out_of_bounds());
    }
}

#[test]
fn test_near_grazing_ray_turns_above_faster_layer() {
    // The near-homogeneous top layer is traced with its top velocity, so a
    // near-grazing ray reaches the layer below with p v just above one and
    // is turned back at the face.
    let model = build_model(&[(0.0, 1480.0), (1000.0, 1480.009), (1500.0, 1490.0)]).unwrap();
    for angle in [89.9_f64, 89.95] {
        let result = model.trace(&request(0.0, angle, 2000.0)).unwrap();
        assert_eq!(result.status, RayStatus::OutTop);
        assert_eq!(result.depth, 0.0);

        let theta = angle.to_radians();
        let time = 2.0 * 1000.0 / (1480.0 * theta.cos());
        assert!(((result.elapsed_time - time) / time).abs() < 1e-9);
        let offset = 2.0 * 1000.0 * theta.tan();
        assert!(((result.offset - offset) / offset).abs() < 1e-9);
    }

    let model = build_model(&[(0.0, 1500.0), (100.0, 1500.0009), (200.0, 1600.0)]).unwrap();
    let path = recorded(&model, &request(0.0, 89.99, 1000.0), RecordMode::Table);
    let deepest = path.iter().map(|p| p.depth).fold(0.0, f64::max);
    assert_eq!(deepest, 100.0);
    assert_eq!(path[path.len() - 1].depth, 0.0);
}

#[test]
fn test_surface_velocity_correction_end_to_end() {
    let model = build_model(&[(0.0, 1500.0), (1000.0, 1500.0)]).unwrap();
    let base = RayRequest {
        launch_angle_deg: 45.0,
        max_time: 0.2,
        surface_velocity: 1450.0,
        null_angle_deg: 15.0,
        ..Default::default()
    };

    let correct = model
        .trace(&RayRequest {
            ssv_mode: SsvMode::AssumeCorrect,
            ..base.clone()
        })
        .unwrap();
    // Snell: the ray parameter is fixed by the surface velocity
    let sine = 45.0_f64.to_radians().sin() * 1500.0 / 1450.0;
    assert!((correct.offset - 1500.0 * sine * 0.2).abs() < 1e-9);

    let incorrect = model
        .trace(&RayRequest {
            ssv_mode: SsvMode::AssumeIncorrect,
            ..base.clone()
        })
        .unwrap();
    let angle = 15.0 + (0.5_f64 * 1500.0 / 1450.0).asin().to_degrees();
    assert!((incorrect.offset - 1500.0 * angle.to_radians().sin() * 0.2).abs() < 1e-9);
    assert!((incorrect.depth - 1500.0 * angle.to_radians().cos() * 0.2).abs() < 1e-9);

    let ignored = model.trace(&base).unwrap();
    assert!((ignored.offset - 1500.0 * 45.0_f64.to_radians().sin() * 0.2).abs() < 1e-9);
}

#[test]
fn test_near_vertical_ray_drifts_slightly() {
    let model = build_model(&[(0.0, 1500.0), (100.0, 1600.0)]).unwrap();
    let angle = 1e-6_f64;
    let result = model.trace(&request(0.0, angle, 10.0)).unwrap();
    assert_eq!(result.status, RayStatus::OutBottom);

    let p = angle.to_radians().sin() / 1500.0;
    let expected = p * (1600.0_f64.powi(2) - 1500.0_f64.powi(2)) / 2.0;
    assert!(((result.offset - expected) / expected).abs() < 1e-9);
}
