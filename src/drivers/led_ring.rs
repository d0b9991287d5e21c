//! 24-LED ring frame generation.
//!
//! Pure functions that turn the current control state into a full frame.
//! LED 0 sits at 12 o'clock; indices increase clockwise.
//!
//! | Display  | Shows                                             |
//! |----------|---------------------------------------------------|
//! | Effect   | 4-LED band per effect in its rainbow colour       |
//! | Heat     | Gradient bar from LED 23 (blue → orange → red)    |
//! | Air      | White centre at LED 0, red inflate / blue deflate |

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

pub const RING_LEDS: usize = 24;

/// One full ring.
pub type Frame = [Rgb; RING_LEDS];

pub const OFF: Rgb = (0x00, 0x00, 0x00);
pub const WHITE: Rgb = (0xFF, 0xFF, 0xFF);
pub const RED: Rgb = (0xFF, 0x00, 0x00);
pub const BLUE: Rgb = (0x00, 0x00, 0xFF);

/// Effect colours in selector order.
pub const RAINBOW: [Rgb; 6] = [
    (0xFF, 0x00, 0x00), // red
    (0xFF, 0x80, 0x00), // orange
    (0xFF, 0xFF, 0x00), // yellow
    (0x00, 0xFF, 0x00), // green
    (0x00, 0x80, 0xFF), // blue
    (0x80, 0x00, 0xFF), // purple
];

const LEDS_PER_BAND: usize = 4;

pub const fn blank() -> Frame {
    [OFF; RING_LEDS]
}

/// Band for effect `index`: four LEDs going clockwise-descending from
/// LED 23 (effect 0 = 23..20, effect 1 = 19..16, ...).
pub fn effect_frame(index: usize) -> Frame {
    let index = index % RAINBOW.len();
    let mut frame = blank();
    let start = RING_LEDS - 1 - index * LEDS_PER_BAND;
    for j in 0..LEDS_PER_BAND {
        frame[(start + RING_LEDS - j) % RING_LEDS] = RAINBOW[index];
    }
    frame
}

/// Gradient colour at `position` steps from the bar start:
/// blue → orange over 0..=12, orange → red over 13..=23.
pub fn heat_gradient(position: usize) -> Rgb {
    if position <= 12 {
        let ratio = position as f32 / 12.0;
        (
            (ratio * 255.0) as u8,
            (ratio * 128.0) as u8,
            (255.0 - ratio * 255.0) as u8,
        )
    } else {
        let ratio = (position - 12) as f32 / 11.0;
        (0xFF, (128.0 - ratio * 128.0) as u8, 0x00)
    }
}

/// Heat bar: `level * 23 / 127` LEDs beyond LED 23, lit downwards.
pub fn heat_frame(level: u8) -> Frame {
    let lit = usize::from(level.min(127)) * 23 / 127;
    let mut frame = blank();
    for (i, led) in frame.iter_mut().enumerate() {
        let from_start = RING_LEDS - 1 - i;
        if from_start <= lit {
            *led = heat_gradient(from_start);
        }
    }
    frame
}

/// Air display centred on 64. Inflation fills red from LED 23 downwards,
/// deflation fills blue from LED 1 upwards; LED 0 is always white.
pub fn air_frame(level: u8) -> Frame {
    let level = usize::from(level.min(127));
    let mut frame = blank();
    frame[0] = WHITE;
    if level > 64 {
        let n = (level - 64) * 12 / 63;
        for i in 1..=n {
            frame[RING_LEDS - i] = RED;
        }
    } else if level < 64 {
        let n = (63 - level) * 12 / 63;
        for led in frame.iter_mut().skip(1).take(n) {
            *led = BLUE;
        }
    }
    frame
}

pub fn lit_count(frame: &Frame) -> usize {
    frame.iter().filter(|c| **c != OFF).count()
}
