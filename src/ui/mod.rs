pub mod controls;
pub mod waveform_panel;
