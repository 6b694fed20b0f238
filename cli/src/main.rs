use clap::Parser;
use hound::WavReader;
use std::path::PathBuf;
use transmitwave_core::{Decoder, EXTENDED_LENGTH, MESG_BYTES};

#[derive(Parser)]
#[command(name = "transmitwave")]
#[command(about = "Acoustic data modem receiver")]
#[command(version)]
struct Cli {
    /// Input WAV file (mono, at the transmitter's sample rate — no resampling is done)
    #[arg(value_name = "INPUT.WAV")]
    input: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut reader = WavReader::open(&cli.input)?;
    let spec = reader.spec();
    println!(
        "read WAV: {} Hz, {} channel(s), {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );
    if spec.channels != 1 {
        return Err(format!("expected a mono WAV file, got {} channels", spec.channels).into());
    }

    let samples: Vec<f32> = match spec.bits_per_sample {
        16 => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        32 => reader.samples::<f32>().collect::<Result<_, _>>()?,
        other => return Err(format!("unsupported bit depth: {}", other).into()),
    };
    println!("read {} samples from {}", samples.len(), cli.input.display());

    let mut decoder = Decoder::new()?;
    let mut payload = [0_u8; MESG_BYTES];
    let mut frames = 0;

    for chunk in samples.chunks(EXTENDED_LENGTH) {
        if decoder.feed(chunk) {
            while decoder.process() {
                let ok = decoder.fetch(&mut payload);
                frames += 1;
                println!("frame {}: fec_ok={} payload={}", frames, ok, hex(&payload));
            }
        }
    }

    if frames == 0 {
        println!("no frames decoded");
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
