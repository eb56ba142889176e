mod cloudinary;
mod twilio;

pub use cloudinary::CloudinaryClient;
pub use twilio::TwilioClient;
