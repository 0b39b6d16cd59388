use crate::node::Node;
use embedded_hal::delay::DelayNs;

/// Runs a blocking super-loop that repeatedly calls [`Node::step`].
///
/// This is the scheduling model of both nodes: one cooperative loop that polls
/// the sensors and the radio mailbox and advances the state machine, with the
/// radio receive interrupt as the only concurrent context.
///
/// # Arguments
/// - `node`: The node to drive (e.g. a [`crate::car::CrashedCarNode`]).
/// - `delay`: A delay provider implementing `DelayNs`, typically from the HAL.
/// - `period_ms`: Pause between iterations, in milliseconds. `0` spins freely.
///
/// # Example
/// ```rust,ignore
/// let mut node = CrashedCarNode::new(config, peripherals);
/// node.start();
/// v2v433::timer::run_super_loop(&mut node, &mut delay, 5);
/// ```
///
/// # Notes
/// - This loop never returns; the nodes run until power loss.
pub fn run_super_loop<N: Node, D: DelayNs>(node: &mut N, delay: &mut D, period_ms: u32) -> ! {
    loop {
        node.step();
        if period_ms > 0 {
            delay.delay_ms(period_ms);
        }
    }
}

/// Runs `iterations` super-loop steps, pausing `period_ms` after each one.
///
/// Useful for bring-up and host simulation where the loop must terminate.
pub fn run_for<N: Node, D: DelayNs>(node: &mut N, delay: &mut D, period_ms: u32, iterations: u32) {
    for _ in 0..iterations {
        node.step();
        if period_ms > 0 {
            delay.delay_ms(period_ms);
        }
    }
}
