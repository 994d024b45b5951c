// This file is part of run_thermal_plate.
//
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#[derive(Debug, Clone, Copy, PartialEq)]
enum IntegratorResetTrigger {
    // Reset when the error becomes positive.
    Rising,
    // Reset when the error becomes zero or negative.
    Falling,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    _kp: f64,
    _ki: f64,
    _kd: f64,
    _sampletime: f64,
    _windup_limit_high: f64,
    _windup_limit_low: f64,
    _last_error: f64,
    _last_iterm: f64,
    _reset_trigger: IntegratorResetTrigger,
}

impl Pid {
    /// Proportional-integral-derivative controller without windup limits.
    ///
    /// # Arguments
    /// * `kp` - Proportional constant.
    /// * `ki` - Integral constant.
    /// * `kd` - Derivative constant.
    /// * `sampletime` - Time between each sample in second.
    ///
    /// # Returns
    /// A new Pid object.
    pub fn new(kp: f64, ki: f64, kd: f64, sampletime: f64) -> Self {
        Self::with_windup_limits(kp, ki, kd, sampletime, f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Proportional-integral-derivative controller with windup limits.
    ///
    /// # Notes
    /// The integral term is clamped to [windup_limit_low, windup_limit_high]
    /// after each accumulation. The clamped value is kept, so an error of the
    /// other sign reduces the integral term from the limit immediately.
    ///
    /// # Arguments
    /// * `kp` - Proportional constant.
    /// * `ki` - Integral constant.
    /// * `kd` - Derivative constant.
    /// * `sampletime` - Time between each sample in second.
    /// * `windup_limit_low` - Max negative buildup of the integral term.
    /// * `windup_limit_high` - Max positive buildup of the integral term.
    ///
    /// # Returns
    /// A new Pid object.
    pub fn with_windup_limits(
        kp: f64,
        ki: f64,
        kd: f64,
        sampletime: f64,
        windup_limit_low: f64,
        windup_limit_high: f64,
    ) -> Self {
        Self {
            _kp: kp,
            _ki: ki,
            _kd: kd,
            _sampletime: sampletime,
            _windup_limit_high: windup_limit_high,
            _windup_limit_low: windup_limit_low,
            _last_error: 0.0,
            _last_iterm: 0.0,
            _reset_trigger: IntegratorResetTrigger::None,
        }
    }

    pub fn kp(&self) -> f64 {
        self._kp
    }

    pub fn ki(&self) -> f64 {
        self._ki
    }

    pub fn kd(&self) -> f64 {
        self._kd
    }

    pub fn sampletime(&self) -> f64 {
        self._sampletime
    }

    pub fn windup_limit_high(&self) -> f64 {
        self._windup_limit_high
    }

    pub fn windup_limit_low(&self) -> f64 {
        self._windup_limit_low
    }

    pub fn last_error(&self) -> f64 {
        self._last_error
    }

    pub fn last_iterm(&self) -> f64 {
        self._last_iterm
    }

    /// Compute the output from a new error value with the last configured
    /// sample time.
    ///
    /// # Arguments
    /// * `error` - Error of the input.
    ///
    /// # Returns
    /// Output of the controller.
    pub fn compute(&mut self, error: f64) -> f64 {
        let is_crossed = match self._reset_trigger {
            IntegratorResetTrigger::Falling => error <= 0.0,
            IntegratorResetTrigger::Rising => error > 0.0,
            IntegratorResetTrigger::None => false,
        };
        if is_crossed {
            self.reset();
            self._reset_trigger = IntegratorResetTrigger::None;
        }

        let iterm = (self._last_iterm + self._sampletime * self._ki * error)
            .clamp(self._windup_limit_low, self._windup_limit_high);
        self._last_iterm = iterm;

        let error_diff = error - self._last_error;
        self._last_error = error;

        let pterm = self._kp * error;
        // No time has passed, so there is no derivative to take.
        let dterm = if self._sampletime > 0.0 {
            self._kd * error_diff / self._sampletime
        } else {
            0.0
        };

        pterm + iterm + dterm
    }

    /// Compute the output from a new error value. The sample time is stored
    /// for the following calls of `compute()`.
    ///
    /// # Arguments
    /// * `error` - Error of the input.
    /// * `sampletime` - Time since the last input in second.
    ///
    /// # Returns
    /// Output of the controller.
    pub fn compute_with_time(&mut self, error: f64, sampletime: f64) -> f64 {
        self._sampletime = sampletime;
        self.compute(error)
    }

    /// Reset the integral term and the last error.
    pub fn reset(&mut self) {
        self._last_error = 0.0;
        self._last_iterm = 0.0;
    }

    /// Arm the integrator to be reset at the next zero crossing of the error.
    ///
    /// # Arguments
    /// * `error` - Reference error. The integrator is reset by the first
    /// later call of `compute()` whose error has the other sign.
    pub fn arm_integrator_reset(&mut self, error: f64) {
        self._reset_trigger = if error <= 0.0 {
            IntegratorResetTrigger::Rising
        } else {
            IntegratorResetTrigger::Falling
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_pid() -> Pid {
        Pid::with_windup_limits(1.0, 2.0, 3.0, 1.0, -5.0, 4.0)
    }

    #[test]
    fn test_new() {
        let pid = create_pid();

        assert_eq!(pid.kp(), 1.0);
        assert_eq!(pid.ki(), 2.0);
        assert_eq!(pid.kd(), 3.0);
        assert_eq!(pid.sampletime(), 1.0);
        assert_eq!(pid.windup_limit_high(), 4.0);
        assert_eq!(pid.windup_limit_low(), -5.0);

        let pid_unbounded = Pid::new(1.0, 0.0, 0.0, 0.1);
        assert_eq!(pid_unbounded.windup_limit_high(), f64::INFINITY);
        assert_eq!(pid_unbounded.windup_limit_low(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_compute_zero_coefficients() {
        let mut pid = Pid::new(0.0, 0.0, 0.0, 1.0);

        assert_eq!(pid.compute(12312.0), 0.0);
        assert_eq!(pid.compute(221351.2), 0.0);
    }

    #[test]
    fn test_compute_state() {
        let mut pid = create_pid();

        pid.compute(2.0);
        pid.compute(3.0);

        assert_eq!(pid.last_error(), 3.0);
        assert_eq!(pid.last_iterm(), 4.0);
    }

    #[test]
    fn test_compute_proportional_only() {
        let mut pid = Pid::new(2.0, 0.0, 0.0, 1.0);

        // The result depends only on the current input
        for error in [0.0, 1.0, -2.0, 3.0, 7.5, -11.0] {
            assert_eq!(pid.compute(error), 2.0 * error);
        }

        // The sample time does not affect the output
        for sampletime in [0.1, 0.2, 0.3, 0.4, 0.5] {
            assert_eq!(pid.compute_with_time(1.0, sampletime), 2.0);
        }
    }

    #[test]
    fn test_compute_derivative_only() {
        let mut pid = Pid::new(0.0, 0.0, 1.0, 1.0);

        let inputs = [0.0, 1.0, 2.0, 4.0, 8.0, 16.0];
        let results: Vec<f64> = inputs.iter().map(|error| pid.compute(*error)).collect();

        assert_eq!(results, vec![0.0, 1.0, 1.0, 2.0, 4.0, 8.0]);

        // Resetting in between calculations and halving the sample time
        let results_reset: Vec<f64> = inputs
            .iter()
            .map(|error| {
                pid.reset();
                pid.compute_with_time(*error, 0.5)
            })
            .collect();

        assert_eq!(results_reset, vec![0.0, 2.0, 4.0, 8.0, 16.0, 32.0]);
    }

    #[test]
    fn test_compute_zero_sampletime() {
        let mut pid = Pid::new(1.0, 1.0, 1.0, 0.0);

        assert_eq!(pid.compute(2.0), 2.0);
    }

    #[test]
    fn test_compute_integral_unbounded() {
        let mut pid = Pid::new(0.0, 1.0, 0.0, 1.0);

        let inputs = [10.0, -10.0, -10.0, 10.0, 10.0, 10.0, -10.0, -10.0];
        let results: Vec<f64> = inputs.iter().map(|error| pid.compute(*error)).collect();

        // The integral term is properly cancelled
        assert_eq!(
            results,
            vec![10.0, 0.0, -10.0, 0.0, 10.0, 20.0, 10.0, 0.0]
        );
    }

    #[test]
    fn test_compute_integral_windup() {
        let mut pid = Pid::with_windup_limits(0.0, 2.0, 0.0, 1.0, -12.0, 16.0);

        let results: Vec<f64> = (0..10).map(|_| pid.compute(3.0)).collect();
        assert_eq!(results[..3], [6.0, 12.0, 16.0]);
        assert!(results.iter().all(|result| *result <= 16.0));

        // Clamped, not frozen: the other sign reduces the term at once
        assert_eq!(pid.compute(-1.0), 14.0);

        let results: Vec<f64> = (0..10).map(|_| pid.compute(-5.0)).collect();
        assert!(results.iter().all(|result| *result >= -12.0));
        assert_eq!(pid.last_iterm(), -12.0);
    }

    #[test]
    fn test_reset() {
        let mut pid = create_pid();
        pid.compute(2.0);

        pid.reset();

        assert_eq!(pid.last_error(), 0.0);
        assert_eq!(pid.last_iterm(), 0.0);
        assert_eq!(pid.kp(), 1.0);
    }

    #[test]
    fn test_arm_integrator_reset_falling() {
        let mut pid = Pid::new(0.0, 1.0, 0.0, 1.0);
        pid.compute(5.0);
        pid.compute(5.0);

        pid.arm_integrator_reset(5.0);

        // Same sign, so the integrator keeps the history
        assert_eq!(pid.compute(1.0), 11.0);

        // Zero crossing resets the integrator before the calculation
        assert_eq!(pid.compute(-2.0), -2.0);

        // Disarmed after the reset
        assert_eq!(pid.compute(3.0), 1.0);
    }

    #[test]
    fn test_arm_integrator_reset_rising() {
        let mut pid = Pid::new(1.0, 1.0, 0.3, 0.5);
        pid.compute(-4.0);
        pid.compute(-3.0);

        pid.arm_integrator_reset(-1.0);
        let result = pid.compute(2.0);

        // Same as resetting right before the call
        let mut pid_reset = Pid::new(1.0, 1.0, 0.3, 0.5);
        pid_reset.compute(-4.0);
        pid_reset.compute(-3.0);
        pid_reset.reset();

        assert_relative_eq!(result, pid_reset.compute(2.0));
    }
}
