//! Frame-paced driver around the pure execution core.
//!
//! The engine itself knows nothing about time or the host; this thin
//! scheduler runs the setup phase once, then repeats loop iterations at a
//! fixed 60Hz budget, talking to the outside world only through the
//! [`RenderingBackend`] and [`InputSource`] traits.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::constants::{FRAME_PERIOD, VIDEO_HEIGHT, VIDEO_WIDTH};
use crate::controller::Button;
use crate::rom::Rom;

use super::{ControlFlow, Emulator};

/// A discrete event produced by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press(Button),
    Release(Button),
    /// Host asked to close; translated into a graceful stop
    Quit,
}

/// Source of controller and host events.
pub trait InputSource {
    /// Return the next pending event without blocking.
    fn poll(&mut self) -> Option<InputEvent>;

    /// Wait up to `timeout` for the next event.
    ///
    /// Called while burning off the remainder of the frame budget, so a
    /// blocking implementation keeps the host responsive between frames.
    fn wait_timeout(&mut self, timeout: Duration) -> Option<InputEvent>;
}

/// An input source that never produces anything, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> Option<InputEvent> {
        None
    }

    fn wait_timeout(&mut self, timeout: Duration) -> Option<InputEvent> {
        std::thread::sleep(timeout);
        None
    }
}

/// Read-only view of the 128x120 video window, one byte per pixel.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pixels: &'a [u8],
}

impl VideoFrame<'_> {
    #[must_use]
    pub fn width(&self) -> usize {
        VIDEO_WIDTH
    }

    #[must_use]
    pub fn height(&self) -> usize {
        VIDEO_HEIGHT
    }

    /// Pixel value at the given window coordinates, row-major.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[x + y * VIDEO_WIDTH]
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }
}

/// Consumer of the frame buffer, once per loop iteration.
pub trait RenderingBackend {
    fn render(&mut self, frame: &VideoFrame<'_>);
}

/// A renderer that throws frames away, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRenderer;

impl RenderingBackend for NoRenderer {
    fn render(&mut self, _frame: &VideoFrame<'_>) {}
}

/// Why a run ended. Both are normal terminations, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The program wrote to the stop port
    Halted,

    /// The input collaborator raised a quit event
    Quit,
}

/// Drives an [`Emulator`] through setup and the paced loop phase.
pub struct Scheduler<R, I> {
    engine: Emulator,
    renderer: R,
    input: I,
    frame_period: Duration,
}

impl<R: RenderingBackend, I: InputSource> Scheduler<R, I> {
    #[must_use]
    pub fn new(engine: Emulator, renderer: R, input: I) -> Self {
        Self {
            engine,
            renderer,
            input,
            frame_period: FRAME_PERIOD,
        }
    }

    /// Override the frame budget. Mostly useful for harnesses and tests.
    #[must_use]
    pub fn with_frame_period(mut self, frame_period: Duration) -> Self {
        self.frame_period = frame_period;
        self
    }

    #[must_use]
    pub fn engine(&self) -> &Emulator {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Emulator {
        &mut self.engine
    }

    /// Mount the ROM and run it to completion.
    ///
    /// The setup phase runs unpaced; each loop iteration then resets the
    /// program counter to the loop entry, drains input, executes until the
    /// 0 sentinel, renders, and waits out the rest of the frame budget. A
    /// frame that blows its budget proceeds immediately, with no catch-up
    /// or frame dropping.
    pub fn run(&mut self, rom: &Rom) -> ExitReason {
        self.engine.start(rom);
        info!("Running setup phase");
        if self.engine.run_until_return() == ControlFlow::Halt {
            return ExitReason::Halted;
        }

        self.run_loop()
    }

    /// Run paced loop iterations forever, without touching the setup phase.
    ///
    /// Used directly when resuming from a restored snapshot, where setup
    /// already ran in a previous session.
    pub fn run_loop(&mut self) -> ExitReason {
        info!("Entering loop phase");
        loop {
            self.engine.begin_frame();

            while let Some(event) = self.input.poll() {
                if self.apply(event) {
                    return ExitReason::Quit;
                }
            }

            let started = Instant::now();
            if self.engine.run_until_return() == ControlFlow::Halt {
                return ExitReason::Halted;
            }

            let frame = VideoFrame {
                pixels: self.engine.memory.video(),
            };
            self.renderer.render(&frame);

            // Burn off the remaining budget while staying responsive to
            // input. An over-budget frame falls straight through.
            loop {
                let Some(remaining) = self.frame_period.checked_sub(started.elapsed()) else {
                    break;
                };
                if let Some(event) = self.input.wait_timeout(remaining) {
                    if self.apply(event) {
                        return ExitReason::Quit;
                    }
                }
            }
        }
    }

    /// Apply one event to the controller. Returns true on a quit request.
    fn apply(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::Press(button) => {
                self.engine.memory.controller_mut().press(button);
                false
            }
            InputEvent::Release(button) => {
                self.engine.memory.controller_mut().release(button);
                false
            }
            InputEvent::Quit => {
                debug!("Quit event received");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::constants::ROM_START;
    use crate::rom::{sample_image, Rom};

    /// Renderer that counts frames and remembers the last first pixel.
    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
        first_pixel: u8,
    }

    impl RenderingBackend for &mut CountingRenderer {
        fn render(&mut self, frame: &VideoFrame<'_>) {
            self.frames += 1;
            self.first_pixel = frame.pixel(0, 0);
        }
    }

    /// Input source replaying a fixed script during the pacing wait.
    struct ScriptedInput {
        events: VecDeque<InputEvent>,
    }

    impl InputSource for ScriptedInput {
        fn poll(&mut self) -> Option<InputEvent> {
            None
        }

        fn wait_timeout(&mut self, _timeout: Duration) -> Option<InputEvent> {
            // Once the script runs out, ask to quit so the test terminates
            Some(self.events.pop_front().unwrap_or(InputEvent::Quit))
        }
    }

    fn put_instruction(image: &mut [u8], address: u16, word: u32) {
        let offset = (address - ROM_START) as usize;
        image[offset..offset + 4].copy_from_slice(&word.to_be_bytes());
    }

    const J_ZERO: u32 = 61 << 26;

    #[test]
    fn quit_event_stops_the_loop() {
        // Setup and loop bodies both return immediately
        let mut image = sample_image(0x8200, 0x8300, 0x8000, 0, 0);
        put_instruction(&mut image, 0x8200, J_ZERO);
        put_instruction(&mut image, 0x8300, J_ZERO);
        let rom = Rom::parse(image).unwrap();

        let mut renderer = CountingRenderer::default();
        let input = ScriptedInput {
            events: [InputEvent::Press(Button::START), InputEvent::Quit].into(),
        };
        let mut scheduler = Scheduler::new(Emulator::default(), &mut renderer, input)
            .with_frame_period(Duration::from_millis(50));

        let exit = scheduler.run(&rom);
        assert_eq!(exit, ExitReason::Quit);
        // The press made it into the controller before the quit
        assert_eq!(scheduler.engine().memory.controller().state(), 0b0001_0000);
        assert!(renderer.frames >= 1);
    }

    #[test]
    fn stop_port_halts_during_setup() {
        // Setup body writes the stop port: sb [r0 + 0x7200] = r0
        let stop = (30u32 << 26) | 0x7200;
        let mut image = sample_image(0x8200, 0x8300, 0x8000, 0, 0);
        put_instruction(&mut image, 0x8200, stop);
        put_instruction(&mut image, 0x8300, J_ZERO);
        let rom = Rom::parse(image).unwrap();

        let mut renderer = CountingRenderer::default();
        let input = ScriptedInput {
            events: VecDeque::new(),
        };
        let mut scheduler = Scheduler::new(Emulator::default(), &mut renderer, input)
            .with_frame_period(Duration::from_millis(1));

        assert_eq!(scheduler.run(&rom), ExitReason::Halted);
        // Never reached the loop phase, so nothing was rendered
        assert_eq!(renderer.frames, 0);
    }

    #[test]
    fn rendered_frame_reads_the_video_window() {
        // Setup paints the first pixel: ori r1 = r0 | 0x7F; sb [r0+0x3400] = r1
        // then returns; the loop body returns immediately.
        let ori = 0x7Fu32 | (1 << 16); // opcode 0, ra 0, rb 1
        let sb = (30u32 << 26) | (1 << 16) | 0x3400;
        let mut image = sample_image(0x8200, 0x8300, 0x8000, 0, 0);
        put_instruction(&mut image, 0x8200, ori);
        put_instruction(&mut image, 0x8204, sb);
        put_instruction(&mut image, 0x8208, J_ZERO);
        put_instruction(&mut image, 0x8300, J_ZERO);
        let rom = Rom::parse(image).unwrap();

        let mut renderer = CountingRenderer::default();
        let input = ScriptedInput {
            events: VecDeque::new(),
        };
        let mut scheduler = Scheduler::new(Emulator::default(), &mut renderer, input)
            .with_frame_period(Duration::from_millis(50));

        assert_eq!(scheduler.run(&rom), ExitReason::Quit);
        assert!(renderer.frames >= 1);
        assert_eq!(renderer.first_pixel, 0x7F);
    }
}
