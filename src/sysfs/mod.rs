pub mod hand_hal_sysfs;
pub mod iio_adc;
pub mod pwm_servo;
