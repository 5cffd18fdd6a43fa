use horde_sim::coords::{
    divide_remain, project_combine,
    scale::{Om, Omt, Sm},
    PointAbsMs, PointAbsOmt, PointAbsSm, TripointAbsMs,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[test]
fn random_points_recombine_exactly() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..2_000 {
        let raw = TripointAbsMs::new(
            rng.gen_range(-20_000..20_000),
            rng.gen_range(-20_000..20_000),
            rng.gen_range(-10..=10),
        );

        let (sm, within_sm) = raw.project_remain::<Sm>();
        assert_eq!(project_combine(sm, within_sm), raw);
        let (omt, within_omt) = raw.project_remain::<Omt>();
        assert_eq!(project_combine(omt, within_omt), raw);
        let (om, within_om) = raw.project_remain::<Om>();
        assert_eq!(project_combine(om, within_om), raw);

        assert!((0..12).contains(&within_sm.x()) && (0..12).contains(&within_sm.y()));
        assert!((0..24).contains(&within_omt.x()) && (0..24).contains(&within_omt.y()));
        assert!((0..4320).contains(&within_om.x()) && (0..4320).contains(&within_om.y()));
        assert_eq!(within_om.z(), raw.z());
    }
}

#[test]
fn projection_is_floor_division() {
    for (v, expected) in [
        (-1, (-1, 11)),
        (-12, (-1, 0)),
        (-13, (-2, 11)),
        (0, (0, 0)),
        (11, (0, 11)),
    ] {
        assert_eq!(divide_remain(v, 12), expected, "{v}");
    }
    assert_eq!(PointAbsMs::new(-1, -1).project_to::<Sm>(), PointAbsSm::new(-1, -1));
    assert_eq!(PointAbsMs::new(-25, 24).project_to::<Omt>(), PointAbsOmt::new(-2, 1));
    assert_eq!(PointAbsOmt::new(-1, 3).project_to::<Sm>(), PointAbsSm::new(-2, 6));
}
