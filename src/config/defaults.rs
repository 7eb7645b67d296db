use super::*;

/// Grid transport fee per hour of day (öre/kWh). Night tariff 22:00-06:00.
pub const DEFAULT_TRANSPORT_FEE: [Decimal; 24] = [
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(5300, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
    Decimal::from_parts(2000, 0, 0, false, 2),
];

/// Energy tax including VAT (öre/kWh)
pub const DEFAULT_TAX: Decimal = Decimal::from_parts(5350, 0, 0, false, 2);

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/pricelight.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ntp_server: "pool.ntp.org:123".to_string(),
            resync_every: 100,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 300_000,
            request_timeout_secs: 5,
        }
    }
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.elprisetjustnu.se".to_string(),
            currency: "SEK".to_string(),
            geography: "SE3".to_string(),
            timezone: "Europe/Stockholm".to_string(),
            request_timeout_secs: 10,
            min_cycle_secs: 100,
            max_cycle_secs: 200,
            window_hours: 18,
        }
    }
}

impl Default for LedPaths {
    fn default() -> Self {
        Self {
            red: "/sys/class/leds/rgb:red/brightness".to_string(),
            green: "/sys/class/leds/rgb:green/brightness".to_string(),
            blue: "/sys/class/leds/rgb:blue/brightness".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_price: Decimal::new(50, 2),
            poll_interval_ms: 50,
            actuator: ActuatorKind::Log,
            relay_path: "/sys/class/gpio/gpio17/value".to_string(),
            led_paths: LedPaths::default(),
            led_max: 255,
        }
    }
}

impl Default for HistogramLayout {
    fn default() -> Self {
        Self {
            bars: 18,
            bar_width: 12,
            bar_gap: 4,
            max_bar_height: 90,
            origin_x: 8,
            origin_y: 120,
            label_every: 3,
        }
    }
}

impl Default for SliderLayout {
    fn default() -> Self {
        Self {
            slots: 13,
            transport_fee: DEFAULT_TRANSPORT_FEE.to_vec(),
            tax: DEFAULT_TAX,
            max_value: Decimal::new(500, 0),
            spacing: 24,
            origin_x: 10,
            origin_y: 220,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            variant: DisplayVariant::Histogram,
            histogram: HistogramLayout::default(),
            slider: SliderLayout::default(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}
