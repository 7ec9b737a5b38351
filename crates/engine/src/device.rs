use cpal::{
    FromSample, SizedSample,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};

use crate::{OutputHandle, Renderer, output_channel};

/// Keeps the device stream alive; dropping it stops output.
pub struct DeviceStream {
    _stream: cpal::Stream,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Open the default output device and drive a [`Renderer`] from its callback.
pub fn start_device() -> anyhow::Result<(OutputHandle, DeviceStream)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow::anyhow!("no output device found"))?;

    let config = device.default_output_config()?;
    let sample_format = config.sample_format();
    let config: cpal::StreamConfig = config.into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let (handle, renderer) = output_channel(sample_rate, channels);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, renderer)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, renderer)?,
        sample_format => anyhow::bail!("unsupported sample format '{sample_format}'"),
    };

    stream.play()?;
    log::info!("output device started: {sample_rate} Hz, {channels} channels");

    Ok((
        handle,
        DeviceStream {
            _stream: stream,
            sample_rate,
            channels,
        },
    ))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut renderer: Renderer,
) -> anyhow::Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::with_capacity(8192);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            renderer.process(&mut scratch);
            for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                *out = T::from_sample(sample);
            }
        },
        |err| log::error!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
