//! One-shot hardware peripheral initialization.
//!
//! Configures the FSR ADC channel, the encoder GPIO interrupts and the
//! LEDC timer/channels for the active product variant using raw ESP-IDF
//! sys calls. Called once from `main()` before the control loop starts.
//! The I²C bus for the haptic driver is owned by `esp-idf-hal` and set up
//! in `main`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::config::ProductVariant;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        let msg = match e {
            HwInitError::AdcInitFailed(_) => "ADC",
            HwInitError::GpioConfigFailed(_) => "GPIO",
            HwInitError::LedcInitFailed(_) => "LEDC",
            HwInitError::IsrInstallFailed(_) => "GPIO ISR",
        };
        log::error!("hw_init: {}", e);
        Self::Init(msg)
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// LEDC channels. Air uses 0-3; heat uses 0.
pub const LEDC_CH_AIR: [u32; 4] = [0, 1, 2, 3];
pub const LEDC_CH_HEAT: u32 = 0;

pub const ADC1_CH_FSR: u32 = 0;

#[cfg(target_os = "espidf")]
pub fn init_peripherals(variant: ProductVariant) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        if variant == ProductVariant::Haptic {
            init_adc()?;
        }
        init_encoder_gpio()?;
        match variant {
            ProductVariant::Air => init_ledc(&pins::AIR_MOTOR_GPIOS)?,
            ProductVariant::Heat => init_ledc(&[pins::HEAT_GPIO])?,
            ProductVariant::Haptic | ProductVariant::LedOnly => {}
        }
    }
    info!("hw_init: peripherals configured for {:?}", variant);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(variant: ProductVariant) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped ({:?})", variant);
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// control-loop ADC read path. `init_adc()` completes before the loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_FSR, &chan_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 configured (CH0=FSR)");
    Ok(())
}

/// One 12-bit sample; 0 on read failure.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, control-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

// ── Encoder GPIO + ISR ────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn encoder_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let (a, b) = unsafe {
        (
            gpio_get_level(pins::ENCODER_A_GPIO) != 0,
            gpio_get_level(pins::ENCODER_B_GPIO) != 0,
        )
    };
    crate::sensors::encoder::encoder_isr_handler(a, b);
}

#[cfg(target_os = "espidf")]
unsafe fn init_encoder_gpio() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: (1u64 << pins::ENCODER_A_GPIO) | (1u64 << pins::ENCODER_B_GPIO),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    // The handler only touches the encoder atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        for pin in [pins::ENCODER_A_GPIO, pins::ENCODER_B_GPIO] {
            let ret = gpio_isr_handler_add(pin, Some(encoder_gpio_isr), core::ptr::null_mut());
            if ret != ESP_OK { return Err(HwInitError::IsrInstallFailed(ret)); }
        }
        // Seed the decoder with the resting level.
        crate::sensors::encoder::encoder_isr_handler(
            gpio_get_level(pins::ENCODER_A_GPIO) != 0,
            gpio_get_level(pins::ENCODER_B_GPIO) != 0,
        );
    }

    info!("hw_init: encoder GPIO {}/{} on any-edge ISR", pins::ENCODER_A_GPIO, pins::ENCODER_B_GPIO);
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc(gpios: &[i32]) -> Result<(), HwInitError> {
    // Timer 0: actuators (1 kHz, 8-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::ACTUATOR_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: single main-task context via init_peripherals().
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }

    for (i, &gpio) in gpios.iter().enumerate() {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: ledc_channel_t_LEDC_CHANNEL_0 + i as u32,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK { return Err(HwInitError::LedcInitFailed(ret)); }
    }

    info!("hw_init: LEDC configured ({} channel(s) at {} Hz)", gpios.len(), pins::ACTUATOR_PWM_FREQ_HZ);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the control loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}
