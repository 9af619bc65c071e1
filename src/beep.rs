use log::debug;
#[cfg(feature = "audio")]
use rodio::{OutputStream, Sink, Source, source::SineWave};

pub const DEFAULT_FREQUENCY: f32 = 440.0;

/// Tone that sounds while the sound timer is non-zero.
///
/// Built without the `audio` feature, or without a usable output device, it
/// only tracks whether it should be sounding.
pub struct Beep {
    #[cfg(feature = "audio")]
    output: Option<(Sink, OutputStream)>,
    sounding: bool,
}

impl Beep {
    #[cfg_attr(not(feature = "audio"), allow(unused_variables))]
    pub fn new(frequency: f32) -> Self {
        Beep {
            #[cfg(feature = "audio")]
            output: open_output(frequency)
                .inspect_err(|e| log::warn!("audio disabled: {e:#}"))
                .ok(),
            sounding: false,
        }
    }

    pub fn follow(&mut self, sound_timer: u8) {
        self.set(sound_timer > 0);
    }

    pub fn silence(&mut self) {
        self.set(false);
    }

    fn set(&mut self, on: bool) {
        if on == self.sounding {
            return;
        }
        self.sounding = on;
        debug!("tone {}", if on { "on" } else { "off" });

        #[cfg(feature = "audio")]
        if let Some((sink, _)) = &self.output {
            if on {
                sink.play();
            } else {
                sink.pause();
            }
        }
    }
}

/// A paused, endless sine wave on the default device.
#[cfg(feature = "audio")]
fn open_output(frequency: f32) -> anyhow::Result<(Sink, OutputStream)> {
    let (stream, handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&handle)?;
    sink.append(SineWave::new(frequency).repeat_infinite());
    sink.pause();
    Ok((sink, stream))
}
