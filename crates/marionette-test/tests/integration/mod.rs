mod authorization;
mod helpers;
mod mechanisms;
mod native;
mod reload;
mod status;
