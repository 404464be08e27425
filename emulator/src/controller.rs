use bitflags::bitflags;

bitflags! {
    /// One bit per controller button, as read from the controller port.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Button: u8 {
        const RIGHT  = 1 << 0;
        const LEFT   = 1 << 1;
        const DOWN   = 1 << 2;
        const UP     = 1 << 3;
        const START  = 1 << 4;
        const SELECT = 1 << 5;
        const B      = 1 << 6;
        const A      = 1 << 7;
    }
}

/// Live state of the 8-button controller.
///
/// The input collaborator pushes press/release events in; programs observe
/// the packed bitmask through the controller port.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    state: Button,
}

impl ControllerState {
    #[must_use]
    pub fn state(self) -> u8 {
        self.state.bits()
    }

    pub fn press(&mut self, button: Button) {
        self.state |= button;
    }

    pub fn release(&mut self, button: Button) {
        self.state &= !button;
    }

    pub fn toggle(&mut self, button: Button) {
        self.state ^= button;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_set_single_bits() {
        let mut controller = ControllerState::default();
        assert_eq!(controller.state(), 0);

        controller.press(Button::A);
        controller.press(Button::RIGHT);
        assert_eq!(controller.state(), 0b1000_0001);

        controller.release(Button::A);
        assert_eq!(controller.state(), 0b0000_0001);

        // Releasing a button that is not held is a no-op
        controller.release(Button::START);
        assert_eq!(controller.state(), 0b0000_0001);
    }

    #[test]
    fn toggle_flips_state() {
        let mut controller = ControllerState::default();
        controller.toggle(Button::SELECT);
        assert_eq!(controller.state(), 0b0010_0000);
        controller.toggle(Button::SELECT);
        assert_eq!(controller.state(), 0);
    }
}
