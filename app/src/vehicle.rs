//! "True physical" vehicle dynamics model.
//!
//! These values are ground truth, not sensor readings: the real speed, real
//! RPM, real coolant temperature. A future virtual-sensor layer would sample
//! them into ADC counts and timer pulses; keeping the physics separate makes
//! fault injection and host-side simulation straightforward.

/// Ground-truth vehicle state, advanced by [`VehicleState::update`] once per
/// control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub speed_kph: f32,
    pub engine_rpm: u16,
    pub coolant_temp_c: f32,
}

impl VehicleState {
    /// Cold engine start: stationary, idling, 30 degrees coolant.
    pub fn new() -> Self {
        VehicleState {
            speed_kph: 0.0,
            engine_rpm: 800,
            coolant_temp_c: 30.0,
        }
    }

    /// Advance the model by one tick.
    ///
    /// The gains are tuned for the 100 ms control tick; `dt_s` guards
    /// against a bogus call rather than scaling the step.
    pub fn update(&mut self, dt_s: f32) {
        if dt_s <= 0.0 {
            return;
        }

        // Coast down by 2% per update (rolling resistance).
        self.speed_kph = (self.speed_kph * 0.98).clamp(0.0, 200.0);

        // RPM follows speed through a linear map (50 RPM per km/h), with
        // 30% convergence per update to model engine inertia.
        let target_rpm = 800.0 + self.speed_kph * 50.0;
        let rpm = f32::from(self.engine_rpm);
        self.engine_rpm = (rpm + (target_rpm - rpm) * 0.3).clamp(600.0, 6000.0) as u16;

        // Coolant rises toward the 90 degree operating point under load,
        // and creeps down when idling.
        if self.engine_rpm > 1000 {
            self.coolant_temp_c += (90.0 - self.coolant_temp_c) * 0.05;
        } else {
            self.coolant_temp_c -= 0.01;
        }
        self.coolant_temp_c = self.coolant_temp_c.clamp(20.0, 110.0);
    }

    pub fn set_target_speed(&mut self, speed_kph: f32) {
        self.speed_kph = speed_kph.clamp(0.0, 200.0);
    }

    /// Direct state injection for fault scenarios. No physics, no
    /// filtering, only the physical-range clamps.
    pub fn force(&mut self, speed_kph: f32, rpm: u16, temp_c: f32) {
        self.speed_kph = speed_kph.clamp(0.0, 200.0);
        self.engine_rpm = f32::from(rpm).clamp(600.0, 6000.0) as u16;
        self.coolant_temp_c = temp_c.clamp(20.0, 110.0);
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        VehicleState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn cold_start_state() {
        let vs = VehicleState::new();
        assert!(approx(vs.speed_kph, 0.0));
        assert_eq!(vs.engine_rpm, 800);
        assert!(approx(vs.coolant_temp_c, 30.0));
    }

    #[test]
    fn one_tick_from_100_kph() {
        let mut vs = VehicleState::new();
        vs.set_target_speed(100.0);
        vs.update(0.1);

        // 2% coast-down, then rpm converges 30% toward 800 + 98 * 50.
        assert!(approx(vs.speed_kph, 98.0));
        assert_eq!(vs.engine_rpm, 2270);
        // Loaded engine: 5% of the gap toward 90 degrees.
        assert!(approx(vs.coolant_temp_c, 33.0));
    }

    #[test]
    fn idling_engine_cools_slowly() {
        let mut vs = VehicleState::new();
        vs.update(0.1);
        assert_eq!(vs.engine_rpm, 800);
        assert!(approx(vs.coolant_temp_c, 29.99));
    }

    #[test]
    fn nonpositive_dt_is_ignored() {
        let mut vs = VehicleState::new();
        vs.set_target_speed(50.0);
        let before = vs;
        vs.update(0.0);
        vs.update(-1.0);
        assert_eq!(vs, before);
    }

    #[test]
    fn set_target_speed_clamps() {
        let mut vs = VehicleState::new();
        vs.set_target_speed(500.0);
        assert!(approx(vs.speed_kph, 200.0));
        vs.set_target_speed(-10.0);
        assert!(approx(vs.speed_kph, 0.0));
    }

    #[test]
    fn force_clamps_every_field() {
        let mut vs = VehicleState::new();
        vs.force(300.0, 9000, 115.0);
        assert!(approx(vs.speed_kph, 200.0));
        assert_eq!(vs.engine_rpm, 6000);
        assert!(approx(vs.coolant_temp_c, 110.0));
    }

    #[test]
    fn coolant_never_exceeds_the_ceiling() {
        let mut vs = VehicleState::new();
        vs.force(vs.speed_kph, vs.engine_rpm, 115.0);
        assert!(approx(vs.coolant_temp_c, 110.0));
        vs.set_target_speed(150.0);
        for _ in 0..100 {
            vs.update(0.1);
            assert!(vs.coolant_temp_c <= 110.0);
        }
    }

    #[test]
    fn rpm_never_falls_below_idle_floor() {
        let mut vs = VehicleState::new();
        vs.force(0.0, 600, 30.0);
        for _ in 0..50 {
            vs.update(0.1);
            assert!(vs.engine_rpm >= 600);
        }
    }
}
