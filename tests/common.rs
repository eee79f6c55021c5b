#![allow(dead_code)]

use vm16_core::{BufferConsole, Machine, RunSummary};

/// Run `image` to completion with `input` as console input.
pub fn run(image: &[u8], input: &str) -> (Machine, RunSummary, String) {
    let mut machine = Machine::with_image(image).expect("image fits");
    let mut console = BufferConsole::buffered(input);
    let summary = machine.run(&mut console);
    (machine, summary, console.output_lossy())
}

/// Little-endian bytes of a 16-bit operand.
pub fn le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
